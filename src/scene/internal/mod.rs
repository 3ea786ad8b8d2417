pub(crate) mod animations;
pub(crate) mod debug;
pub(crate) mod transforms;
