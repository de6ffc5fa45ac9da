pub(crate) mod lru_replacer;
pub(crate) mod replacer;
