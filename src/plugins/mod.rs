pub mod vcvars_listener;

pub use vcvars_listener::VcvarsListener;
