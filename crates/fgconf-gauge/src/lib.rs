//! Transport registry for fuel gauge access
//!
//! This crate maps transport strings onto concrete register transports and
//! hands back either a bare protocol engine or an attached, lock-guarded
//! device handle. The CLI only names transports; it never depends on a
//! back-end crate directly.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                      CLI (bin/fgconf)                     │
//! │  - Only imports fgconf-gauge and fgconf-core              │
//! └──────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌──────────────────────────────────────────────────────────┐
//! │                   fgconf-gauge (this crate)               │
//! │  - open_transport / open_engine / open_gauge              │
//! │  - Transport strings: "name:key=value,..."                │
//! └──────────────────────────────────────────────────────────┘
//!                              │
//!              ┌───────────────┴───────────────┐
//!              ▼                               ▼
//! ┌──────────────────────────┐   ┌──────────────────────────┐
//! │      fgconf-core         │   │  Transport crates        │
//! │  - Gauge protocol engine │   │  - dummy, linux-i2c      │
//! │  - DeviceHandle          │   │  - RegisterTransport     │
//! │  - Golden profiles       │   │                          │
//! └──────────────────────────┘   └──────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use fgconf_gauge::open_gauge;
//! use fgconf_core::{profile::builtin, AttachOptions, NoProgress};
//!
//! let options = AttachOptions::new(builtin::ZEROGRAVITAS);
//! let handle = open_gauge("linux_i2c:dev=/dev/i2c-1", &options, &mut NoProgress)?;
//! println!("{:?}", handle.report());
//! ```

mod registry;

pub use registry::{
    available_transports, open_engine, open_gauge, open_transport, parse_transport_params,
    transport_names_short, BoxedTransport, GaugeEngine, GaugeHandle, TransportInfo,
    TransportParams,
};
