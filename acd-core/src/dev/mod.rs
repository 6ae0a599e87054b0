use std::fmt;

pub mod manager;
pub mod modbus_srv;
pub mod srv_config;

use srv_config::{ModbusRtuConfError, ModbusTcpConfError};

#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    #[error("从站缺少id")]
    InvalidId,
    #[error("从站缺少通信类型")]
    InvalidComType,
    #[error("无效的单元数量: {0}")]
    InvalidUnits(u16),
    #[error("无效的单元地址步长: {0}")]
    InvalidUnitIncrement(u16),
    #[error(transparent)]
    TcpConf(#[from] ModbusTcpConfError),
    #[error(transparent)]
    RtuConf(#[from] ModbusRtuConfError),
}

pub trait Identifiable: Sync + Send {
    fn id(&self) -> String;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum LifecycleState {
    New = 0,
    Initializing = 1,
    Ready = 2,
    Starting = 3,
    Binding = 4,
    Listening = 5,
    Running = 6,
    Stopping = 7,
    Stopped = 8,
    Failed = 9,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LifecycleState::New => "New",
            LifecycleState::Initializing => "Initializing",
            LifecycleState::Ready => "Ready",
            LifecycleState::Starting => "Starting",
            LifecycleState::Binding => "Binding",
            LifecycleState::Listening => "Listening",
            LifecycleState::Running => "Running",
            LifecycleState::Stopping => "Stopping",
            LifecycleState::Stopped => "Stopped",
            LifecycleState::Failed => "Failed",
        };
        f.write_str(name)
    }
}

#[async_trait::async_trait]
pub trait Lifecycle {
    fn init(&self) -> Result<(), DeviceError>;
    async fn start(&self) -> Result<(), DeviceError>;
    async fn stop(&self) -> Result<(), DeviceError>;
    fn state(&self) -> LifecycleState;
}

pub trait Executable: Identifiable + Lifecycle {}
