pub(crate) mod claims;
pub(crate) mod issuer;
#[cfg(test)]
pub(crate) mod memory;
pub(crate) mod postgres;
pub(crate) mod store;
pub(crate) mod verifier;
