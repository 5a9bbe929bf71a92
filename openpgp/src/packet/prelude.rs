//! Brings most relevant types and traits into scope for working with
//! packets.
//!
//! Less often used types and types that are more likely to lead to a
//! naming conflict are not brought into scope.
//!
//! Traits are brought into scope anonymously.
//!
//! ```
//! # #![allow(unused_imports)]
//! # extern crate cutlass_openpgp as openpgp;
//! use openpgp::packet::prelude::*;
//! ```

pub use crate::packet::{
    AED,
    AED1,
    CompressedData,
    Header,
    Key,
    Literal,
    MDC,
    Marker,
    OnePassSig,
    OnePassSig3,
    PKESK,
    PKESK3,
    SED,
    SEIP,
    SEIP1,
    SKESK,
    SKESK4,
    SKESK5,
    Signature,
    Signature4,
    SignatureBuilder,
    Tag,
    Trust,
    Unknown,
    UserAttribute,
    UserID,
    key::Key4,
    signature::subpacket::NotationData,
    signature::subpacket::NotationDataFlags,
    signature::subpacket::Subpacket,
    signature::subpacket::SubpacketArea,
    signature::subpacket::SubpacketAreas,
    signature::subpacket::SubpacketTag,
    signature::subpacket::SubpacketValue,
};
