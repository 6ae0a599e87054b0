use std::{collections::HashMap, sync::Arc};

use tracing::error;

use crate::config::{ComType, Server};
use crate::dev::{DeviceError, Executable, Identifiable, Lifecycle, modbus_srv::ModbusSrv};

pub struct DevManager {
    servers: Vec<Arc<dyn Executable>>,
}

impl DevManager {
    pub fn new(map: HashMap<String, Server>) -> Self {
        let mut servers: Vec<Arc<dyn Executable>> = Vec::new();
        for (_, srv) in map.into_iter() {
            let Some(com_type) = srv.config.com_type else {
                continue;
            };
            match init_server(srv, com_type) {
                Ok(srv) => {
                    servers.push(srv);
                }
                Err(err) => {
                    error!("{}", err)
                }
            }
        }
        DevManager { servers }
    }

    pub fn add_server(&mut self, server: Arc<dyn Executable>) {
        self.servers.push(server);
    }

    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }

    pub async fn start_all(&self) {
        for srv in self.servers.iter() {
            if let Err(err) = srv.init() {
                error!("[{}] 初始化失败: {}", srv.id(), err);
                continue;
            }
            if let Err(err) = srv.start().await {
                error!("[{}] 启动失败: {}", srv.id(), err);
            }
        }
    }

    pub async fn stop_all(&self) {
        for srv in self.servers.iter() {
            if let Err(err) = srv.stop().await {
                error!("[{}] 停止失败: {}", srv.id(), err);
            }
        }
    }
}

fn init_server(srv: Server, com_type: ComType) -> Result<Arc<dyn Executable>, DeviceError> {
    match com_type {
        ComType::ModbusTCP | ComType::ModbusRTU => Ok(Arc::new(ModbusSrv::new(srv)?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;

    fn entry(id: &str, com_type: Option<ComType>) -> Server {
        Server {
            id: Some(id.to_string()),
            desc: None,
            config: ServerConfig {
                com_type,
                ip: Some("127.0.0.1".to_string()),
                port: Some(1502),
                slave: None,
                serial_tty: None,
                baud_rate: None,
                data_bits: None,
                parity: None,
                stop_bits: None,
                units: None,
                unit_increment: None,
                desc: None,
            },
        }
    }

    #[test]
    fn skips_entries_without_com_type() {
        let mut map = HashMap::new();
        map.insert("a".to_string(), entry("a", None));
        let manager = DevManager::new(map);
        assert!(manager.is_empty());
    }

    #[test]
    fn builds_tcp_servers_from_config() {
        let mut map = HashMap::new();
        map.insert("a".to_string(), entry("a", Some(ComType::ModbusTCP)));
        // RTU缺少串口参数, 构建失败但不影响其它从站
        map.insert("b".to_string(), entry("b", Some(ComType::ModbusRTU)));
        let manager = DevManager::new(map);
        assert_eq!(manager.servers.len(), 1);
    }
}
