mod timing;

pub use timing::backoff;
