pub mod kucoin_models;
pub mod opportunity;
pub mod quote;
pub mod symbol;
pub mod symbol_map;
pub mod triangular_path;
