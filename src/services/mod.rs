pub(crate) mod finalize;
pub(crate) mod integrity;
pub(crate) mod scoring;
pub(crate) mod session;
