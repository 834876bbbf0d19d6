//! Candle data model and provider wire types.

pub mod bitquery;
pub mod candle;
