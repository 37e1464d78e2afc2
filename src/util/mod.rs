//! More-or-less general-purpose utility functions.

pub mod out_dir;

pub use self::out_dir::OutDir;
