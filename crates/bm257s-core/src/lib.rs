//! Core functionalities: serial transport, frame alignment, background reader, measurements.

pub mod aligner;
pub mod measurement;
pub mod reader;
pub mod serial;

pub use aligner::FrameAligner;
pub use measurement::{ClassifyError, CurrentKind, Measurement, Prefix, TemperatureUnit};
pub use reader::{PackageHandle, PackageReader, ReaderError};
pub use serial::{list_ports, ByteSource, PortInfo, SerialConfig, SerialSource, TransportError};

pub use bm257s_decode::{decode, DecodeError, Frame, Symbol};
