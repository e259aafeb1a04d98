//! # MTProto core types
//!
//! Base types for the MTProto networking core: TL primitives, the TL
//! serialization traits, and the fixed set of MTProto-layer constructors
//! (handshake + service messages) the core needs.
//!
//! ## Modules
//!
//! - [`primitive`] - Primitive TL types (int, long, double, string, bytes, bool)
//! - [`vector`] - Collection types (Vector, Maybe, Dictionary)
//! - [`tl`] - TL serialization/deserialization traits
//! - [`mtproto_auth`] - Handshake-layer TL constructors (resPQ, server_DH_params, ...)
//! - [`error`] - Error types for the crate

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![allow(clippy::derivable_impls)]
#![allow(clippy::redundant_closure)]
#![allow(clippy::let_and_return)]
#![allow(mismatched_lifetime_syntaxes)]

pub mod error;
pub mod mtproto_auth;
pub mod primitive;
pub mod tl;
pub mod vector;

// Re-export commonly used types at the crate root
pub use error::{InvalidIdError, TypeError, TypeResult};
pub use primitive::{
    TlBool, TlBytes, TlDouble, TlInt, TlInt128, TlInt256, TlLong, TlString, TlTrue,
};
pub use tl::{TlBoxed, TlConstructor, TlDeserialize, TlHelper, TlSerialize};
pub use vector::{Maybe, TlDictionary, TlVector};
pub use mtproto_auth::{
    AuthBindTempAuthKey, BindAuthKeyInner, ClientDhInnerData, DhGenFail, DhGenOk, DhGenResponse,
    DhGenRetry, PQInnerDataDc, PQInnerDataTempDc, PQInnerDataTempDcOptions, ReqDhParams,
    ReqPqMulti, ResPq, ServerDhInnerData, ServerDhParamsOk, SetClientDhParams,
};

/// Version information for the crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name.
pub const CRATE_NAME: &str = "rustgram-types";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
        assert_eq!(CRATE_NAME, "rustgram-types");
    }

    #[test]
    fn test_vector() {
        let mut vec = TlVector::new();
        vec.push(1);
        vec.push(2);
        vec.push(3);
        assert_eq!(vec.len(), 3);
        assert_eq!(vec[0], 1);
    }

    #[test]
    fn test_maybe() {
        let some = Maybe::Some(42);
        assert!(some.is_some());
        assert_eq!(some.to_option(), Some(42));

        let none: Maybe<i32> = Maybe::None;
        assert!(none.is_none());
    }

    #[test]
    fn test_tl_bool() {
        assert!(TlBool::True.as_bool());
        assert!(!TlBool::False.as_bool());
        assert_eq!(TlBool::True.constructor_id(), 0x997275b5);
    }
}
