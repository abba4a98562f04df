//! Binance trade stream — subscription builder and frame decoder.

pub mod json_parser;
