use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::AtomicU8;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::time;
use tokio_modbus::server::rtu::Server as RtuServer;
use tokio_modbus::server::tcp::{Server as TcpServer, accept_tcp_connection};
use tokio_serial::{DataBits, Parity, SerialStream, StopBits};
use tracing::warn;

use crate::bank::UnitBank;
use crate::dev::LifecycleState;
use crate::dev::modbus_srv::Protocol;
use crate::dev::srv_config::{ModbusRtuConfig, ModbusTcpConfig};

use super::backoff::Backoff;
use super::error::ModbusSrvError;
use super::service::{AcService, AcSlaveService};
use super::state::store_state;

pub(super) struct SrvRunner {
    pub(super) id: String,
    pub(super) protocol: Protocol,
    pub(super) bank: Arc<UnitBank>,
    pub(super) state: Arc<AtomicU8>,
    pub(super) stop_rx: watch::Receiver<bool>,
}

impl SrvRunner {
    fn stop_requested(stop_rx: &watch::Receiver<bool>) -> bool {
        *stop_rx.borrow()
    }

    fn service(&self) -> AcService {
        AcService::new(self.id.clone(), Arc::clone(&self.bank))
    }

    async fn serve_tcp(
        &self,
        cfg: &ModbusTcpConfig,
        stop_rx: &mut watch::Receiver<bool>,
    ) -> Result<(), ModbusSrvError> {
        let addr: SocketAddr = format!("{}:{}", cfg.ip, cfg.port).parse()?;
        let listener = TcpListener::bind(addr).await?;
        store_state(&self.id, &self.state, LifecycleState::Listening);

        let server = TcpServer::new(listener);
        let service = self.service();
        let new_service = move |_socket_addr| Ok(Some(service.clone()));
        let on_connected = move |stream, socket_addr| {
            let new_service = new_service.clone();
            async move { accept_tcp_connection(stream, socket_addr, new_service) }
        };
        let id = self.id.clone();
        let on_process_error = move |err| {
            warn!("[{}] 连接处理失败: {}", id, err);
        };

        store_state(&self.id, &self.state, LifecycleState::Running);
        if *stop_rx.borrow_and_update() {
            return Ok(());
        }
        tokio::select! {
            res = server.serve(&on_connected, on_process_error) => res.map_err(Into::into),
            _ = stop_rx.changed() => Ok(()),
        }
    }

    async fn serve_rtu(
        &self,
        cfg: &ModbusRtuConfig,
        stop_rx: &mut watch::Receiver<bool>,
    ) -> Result<(), ModbusSrvError> {
        let mut builder = tokio_serial::new(cfg.serial_tty.as_str(), cfg.baudrate);
        builder = builder
            .data_bits(match cfg.data_bits {
                5 => DataBits::Five,
                6 => DataBits::Six,
                7 => DataBits::Seven,
                _ => DataBits::Eight,
            })
            .parity(match cfg.parity.to_ascii_uppercase().as_str() {
                "E" | "EVEN" => Parity::Even,
                "O" | "ODD" => Parity::Odd,
                _ => Parity::None,
            })
            .stop_bits(match cfg.stop_bits {
                2 => StopBits::Two,
                _ => StopBits::One,
            });
        let port = SerialStream::open(&builder)?;
        store_state(&self.id, &self.state, LifecycleState::Listening);

        let server = RtuServer::new(port);
        let service = AcSlaveService::new(cfg.slave, self.service());

        store_state(&self.id, &self.state, LifecycleState::Running);
        if *stop_rx.borrow_and_update() {
            return Ok(());
        }
        tokio::select! {
            res = server.serve_forever(service) => res.map_err(Into::into),
            _ = stop_rx.changed() => Ok(()),
        }
    }

    pub(super) async fn run(&self) {
        let mut stop_rx = self.stop_rx.clone();
        let mut backoff = Backoff::new(Duration::from_millis(500), Duration::from_secs(10));
        loop {
            if Self::stop_requested(&stop_rx) {
                store_state(&self.id, &self.state, LifecycleState::Stopped);
                return;
            }
            store_state(&self.id, &self.state, LifecycleState::Binding);
            let res = match &self.protocol {
                Protocol::Tcp(cfg) => self.serve_tcp(cfg, &mut stop_rx).await,
                Protocol::Rtu(cfg) => self.serve_rtu(cfg, &mut stop_rx).await,
            };
            match res {
                Ok(()) => backoff.reset(),
                Err(err) => {
                    store_state(&self.id, &self.state, LifecycleState::Failed);
                    warn!("[{}] 服务中断, 准备重新监听: {}", self.id, err);
                }
            }
            if Self::stop_requested(&stop_rx) {
                store_state(&self.id, &self.state, LifecycleState::Stopped);
                return;
            }
            let delay = backoff.next_delay();
            tokio::select! {
                _ = time::sleep(delay) => {}
                _ = stop_rx.changed() => {
                    if Self::stop_requested(&stop_rx) {
                        store_state(&self.id, &self.state, LifecycleState::Stopped);
                        return;
                    }
                }
            }
        }
    }
}
