use std::sync::Arc;
use std::sync::atomic::AtomicU8;
use std::time::Duration;

use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio::time;
use tracing::info;

use crate::bank::UnitBank;
use crate::config::{self, DEFAULT_UNIT_INCREMENT, DEFAULT_UNITS, Server};
use crate::core::unit::HOLDING_COUNT;
use crate::dev::modbus_srv::Protocol;
use crate::dev::srv_config::{ModbusRtuConfig, ModbusTcpConfig};
use crate::dev::{DeviceError, Executable, Identifiable, Lifecycle, LifecycleState};

use super::runner::SrvRunner;
use super::state::{cas_state, load_state, store_state};

/// 一个Modbus从站实例: 持有状态表并在后台任务里跑监听循环
pub struct ModbusSrv {
    id: String,
    protocol: Protocol,
    bank: Arc<UnitBank>,
    state: Arc<AtomicU8>,
    stop_tx: watch::Sender<bool>,
    stop_rx: watch::Receiver<bool>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl ModbusSrv {
    pub fn new(srv: Server) -> Result<Self, DeviceError> {
        let Some(id) = srv.id else {
            return Err(DeviceError::InvalidId);
        };
        let Some(com_type) = srv.config.com_type else {
            return Err(DeviceError::InvalidComType);
        };
        let units = srv.config.units.unwrap_or(DEFAULT_UNITS);
        if units == 0 {
            return Err(DeviceError::InvalidUnits(units));
        }
        let increment = srv.config.unit_increment.unwrap_or(DEFAULT_UNIT_INCREMENT);
        // 步长必须容纳单元内最大的偏移窗口, 否则地址归一化会串台
        if increment < HOLDING_COUNT {
            return Err(DeviceError::InvalidUnitIncrement(increment));
        }
        if (units as u32) * (increment as u32) > u16::MAX as u32 + 1 {
            return Err(DeviceError::InvalidUnits(units));
        }
        let protocol = match com_type {
            config::ComType::ModbusTCP => Protocol::Tcp(ModbusTcpConfig::try_from(srv.config)?),
            config::ComType::ModbusRTU => Protocol::Rtu(ModbusRtuConfig::try_from(srv.config)?),
        };
        let bank = Arc::new(UnitBank::new(units, increment));
        let state = Arc::new(AtomicU8::new(LifecycleState::New as u8));
        let (stop_tx, stop_rx) = watch::channel(false);
        info!("加载{}配置成功! units={} increment={}", id, units, increment);
        Ok(ModbusSrv {
            id,
            protocol,
            bank,
            state,
            stop_tx,
            stop_rx,
            task: Mutex::new(None),
        })
    }

    pub fn bank(&self) -> Arc<UnitBank> {
        Arc::clone(&self.bank)
    }

    fn load_state(&self) -> LifecycleState {
        load_state(&self.state)
    }

    fn cas_state(&self, from: LifecycleState, to: LifecycleState) -> bool {
        cas_state(&self.state, from, to)
    }

    fn store_state(&self, to: LifecycleState) {
        store_state(&self.id, &self.state, to);
    }
}

impl Identifiable for ModbusSrv {
    fn id(&self) -> String {
        self.id.clone()
    }
}

#[async_trait::async_trait]
impl Lifecycle for ModbusSrv {
    fn init(&self) -> Result<(), DeviceError> {
        if !self.cas_state(LifecycleState::New, LifecycleState::Initializing) {
            return Ok(());
        }
        self.store_state(LifecycleState::Ready);
        Ok(())
    }

    async fn start(&self) -> Result<(), DeviceError> {
        let ok = self.cas_state(LifecycleState::Ready, LifecycleState::Starting)
            || self.cas_state(LifecycleState::Stopped, LifecycleState::Starting);
        if !ok {
            return Ok(());
        }
        let _ = self.stop_tx.send(false);
        let mut task_guard = self.task.lock().await;
        if let Some(handle) = task_guard.take() {
            handle.abort();
        }
        let runner = SrvRunner {
            id: self.id.clone(),
            protocol: self.protocol.clone(),
            bank: Arc::clone(&self.bank),
            state: Arc::clone(&self.state),
            stop_rx: self.stop_rx.clone(),
        };
        let handle = tokio::spawn(async move {
            runner.run().await;
        });
        *task_guard = Some(handle);
        Ok(())
    }

    async fn stop(&self) -> Result<(), DeviceError> {
        let _ = self.stop_tx.send(true);
        let cur = self.load_state();
        match cur {
            LifecycleState::Stopped => return Ok(()),
            LifecycleState::New | LifecycleState::Ready => {
                self.store_state(LifecycleState::Stopped);
                return Ok(());
            }
            LifecycleState::Stopping => {}
            _ => {
                let _ = self.cas_state(cur, LifecycleState::Stopping);
            }
        }

        let mut task_guard = self.task.lock().await;
        if let Some(mut handle) = task_guard.take() {
            tokio::select! {
                _ = time::sleep(Duration::from_secs(3)) => {
                    handle.abort();
                }
                _ = &mut handle => {}
            }
        }
        Ok(())
    }

    fn state(&self) -> LifecycleState {
        self.load_state()
    }
}

impl Executable for ModbusSrv {}
