mod backoff;
mod device;
mod error;
mod runner;
mod service;
mod state;

pub use device::ModbusSrv;
pub use error::ModbusSrvError;
pub use service::AcService;

use crate::dev::srv_config::{ModbusRtuConfig, ModbusTcpConfig};

#[derive(Clone)]
pub(super) enum Protocol {
    Tcp(ModbusTcpConfig),
    Rtu(ModbusRtuConfig),
}
