pub(crate) mod exam;
pub(crate) mod result;
pub(crate) mod session;
