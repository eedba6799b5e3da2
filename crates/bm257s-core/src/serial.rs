use serialport::{SerialPort, SerialPortInfo, SerialPortType, UsbPortInfo};
use std::io::{self, Read};
use std::time::Duration;

/// Anything the reader thread can pull raw bytes from.
///
/// `read_bytes` blocks for at most the source's own timeout and returns
/// `Ok(0)` when nothing arrived; it never reports a timeout as an error.
pub trait ByteSource: Send + 'static {
    fn read_bytes(&mut self, buf: &mut [u8]) -> io::Result<usize>;
}

impl<T: ByteSource + ?Sized> ByteSource for Box<T> {
    fn read_bytes(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        (**self).read_bytes(buf)
    }
}

impl ByteSource for dyn SerialPort {
    fn read_bytes(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        read_or_timeout(self, buf)
    }
}

fn read_or_timeout<R: Read + ?Sized>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    match reader.read(buf) {
        Err(e) if e.kind() == io::ErrorKind::TimedOut => Ok(0),
        other => other,
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("open {port} failed: {source}")]
    Open {
        port: String,
        #[source]
        source: serialport::Error,
    },
}

/// One entry of the system's serial port list.
#[derive(Debug, Clone)]
pub struct PortInfo {
    pub port_name: String,
    pub port_type: &'static str,
    /// Adapter details, for USB ports only.
    pub usb: Option<UsbPortInfo>,
}

fn port_type_name(port_type: &SerialPortType) -> &'static str {
    match port_type {
        SerialPortType::UsbPort(_) => "USB",
        SerialPortType::PciPort => "PCI",
        SerialPortType::BluetoothPort => "Bluetooth",
        SerialPortType::Unknown => "Unknown",
    }
}

impl From<SerialPortInfo> for PortInfo {
    fn from(info: SerialPortInfo) -> Self {
        let port_type = port_type_name(&info.port_type);
        let usb = match info.port_type {
            SerialPortType::UsbPort(usb) => Some(usb),
            _ => None,
        };
        Self {
            port_name: info.port_name,
            port_type,
            usb,
        }
    }
}

pub fn list_ports() -> Vec<PortInfo> {
    serialport::available_ports()
        .unwrap_or_default()
        .into_iter()
        .map(PortInfo::from)
        .collect()
}

pub const DEFAULT_PORT: &str = "/dev/ttyUSB0";

/// Line settings of the meter's optical serial cable.
#[derive(Debug, Clone)]
pub struct SerialConfig {
    pub port_name: String,
    pub baud_rate: u32,
    pub data_bits: serialport::DataBits,
    pub parity: serialport::Parity,
    pub stop_bits: serialport::StopBits,
    pub flow_control: serialport::FlowControl,
    /// Upper bound for one read, and so for how long `PackageReader::stop` waits.
    pub read_timeout: Duration,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port_name: DEFAULT_PORT.to_string(),
            baud_rate: 9600,
            data_bits: serialport::DataBits::Eight,
            parity: serialport::Parity::None,
            stop_bits: serialport::StopBits::One,
            flow_control: serialport::FlowControl::None,
            read_timeout: Duration::from_millis(500),
        }
    }
}

/// An open serial port feeding a `PackageReader`.
pub struct SerialSource {
    port: Box<dyn SerialPort>,
}

impl SerialSource {
    pub fn open(cfg: &SerialConfig) -> Result<Self, TransportError> {
        let port = serialport::new(&cfg.port_name, cfg.baud_rate)
            .data_bits(cfg.data_bits)
            .parity(cfg.parity)
            .stop_bits(cfg.stop_bits)
            .flow_control(cfg.flow_control)
            .timeout(cfg.read_timeout)
            .open()
            .map_err(|source| TransportError::Open {
                port: cfg.port_name.clone(),
                source,
            })?;
        log::debug!("opened {} at {} baud", cfg.port_name, cfg.baud_rate);
        Ok(Self { port })
    }

    pub fn name(&self) -> Option<String> {
        self.port.name()
    }
}

impl ByteSource for SerialSource {
    fn read_bytes(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        read_or_timeout(&mut self.port, buf)
    }
}
