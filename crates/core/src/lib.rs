pub mod cache {
    pub mod error;
    pub mod policy;
    pub mod port;
}

pub mod common;
pub mod config;

pub mod indicator {
    pub mod error;
    pub mod kind;
}

pub mod market {
    pub mod entity;
    pub mod error;
    pub mod frame;
    pub mod port;
}

pub mod store {
    pub mod error;
    pub mod port;
}

#[cfg(feature = "test-utils")]
pub mod test_utils;
