pub(crate) mod confirmation;
pub(crate) mod targeting;
