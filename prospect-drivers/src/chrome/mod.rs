pub mod behavioral;
pub mod fingerprint;
pub mod launch;
pub mod shared;
