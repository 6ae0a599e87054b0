use serde::Deserialize;
use std::collections::HashMap;
use tokio::fs;

/// 未显式配置时的空调单元数量
pub const DEFAULT_UNITS: u16 = 16;
/// 未显式配置时每台空调占用的Modbus地址步长
pub const DEFAULT_UNIT_INCREMENT: u16 = 10;

#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    #[error("Failed to read file: {0}")]
    ReadFileError(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    ParseJsonError(#[from] serde_json::Error),
}

#[derive(Debug)]
pub struct Configuration {
    pub project: Project,
}

impl Configuration {
    pub async fn new(path: String) -> Result<Self, ConfigurationError> {
        let mut bytes = fs::read(path.as_str()).await?;
        // strip UTF-8 BOM (EF BB BF)
        if bytes.starts_with(&[0xEF, 0xBB, 0xBF]) {
            bytes.drain(..3);
        }
        while matches!(bytes.first(), Some(b' ' | b'\n' | b'\r' | b'\t')) {
            bytes.drain(..1);
        }
        let project = serde_json::from_slice::<Project>(&bytes)?;
        Ok(Self { project })
    }
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub product_type: Option<String>,
    pub project: Option<String>,
    pub servers: HashMap<String, Server>,
}

/// 一个对外暴露的Modbus从站, 背后是一组空调单元
#[derive(Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct Server {
    pub id: Option<String>,
    pub desc: Option<String>,
    pub config: ServerConfig,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq)]
pub enum ComType {
    #[serde(rename = "ModbusTCP")]
    ModbusTCP,
    #[serde(rename = "ModbusRTU")]
    ModbusRTU,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfig {
    #[serde(rename = "comType")]
    pub com_type: Option<ComType>,
    pub ip: Option<String>,
    pub port: Option<u16>,
    pub slave: Option<u8>,
    pub serial_tty: Option<String>,
    pub baud_rate: Option<u32>,
    pub data_bits: Option<u8>,
    pub parity: Option<String>,
    pub stop_bits: Option<u8>,
    pub units: Option<u16>,
    pub unit_increment: Option<u16>,
    pub desc: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_project_json() {
        let raw = r#"{
            "productType": "acd",
            "project": "demo",
            "servers": {
                "ac1": {
                    "id": "ac1",
                    "desc": "一楼空调",
                    "config": {
                        "comType": "ModbusTCP",
                        "ip": "0.0.0.0",
                        "port": 1502,
                        "units": 8,
                        "unitIncrement": 10
                    }
                }
            }
        }"#;
        let project: Project = serde_json::from_str(raw).unwrap();
        assert_eq!(project.servers.len(), 1);
        let srv = &project.servers["ac1"];
        assert_eq!(srv.config.com_type, Some(ComType::ModbusTCP));
        assert_eq!(srv.config.port, Some(1502));
        assert_eq!(srv.config.units, Some(8));
        assert_eq!(srv.config.unit_increment, Some(10));
    }

    #[tokio::test]
    async fn new_strips_bom() {
        let dir = std::env::temp_dir();
        let path = dir.join("acd-config-bom-test.json");
        let mut bytes = vec![0xEF, 0xBB, 0xBF];
        bytes.extend_from_slice(br#"{"servers": {}}"#);
        tokio::fs::write(&path, bytes).await.unwrap();
        let conf = Configuration::new(path.to_string_lossy().into_owned())
            .await
            .unwrap();
        assert!(conf.project.servers.is_empty());
        let _ = tokio::fs::remove_file(&path).await;
    }
}
