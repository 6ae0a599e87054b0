use std::net::AddrParseError;

#[derive(Debug, thiserror::Error)]
pub enum ModbusSrvError {
    #[error("IP parse error: {0}")]
    IpParseError(#[from] AddrParseError),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Serial port error: {0}")]
    SerialError(#[from] tokio_serial::Error),
}
