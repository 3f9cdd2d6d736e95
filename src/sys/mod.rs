pub(crate) mod futex;
pub(crate) mod socket;
pub(crate) mod thread;
