use std::{
    collections::HashMap,
    io::{self, Read, Write},
    time::Duration,
};

use posechain::{ActuatorChannel, ChannelFault, CommFault, Error, JointId, PositionCount};
use serialport::{ClearBuffer, SerialPort};
use tracing::{debug, info, trace, warn};

use crate::{
    config::{ControlTable, DynamixelChannelConfig},
    packet::{self, Instruction, StatusPacket},
};

const TORQUE_ENABLE: u8 = 1;
const TORQUE_DISABLE: u8 = 0;
// Most status packets from other ids skipped while waiting for one reply.
const MAX_STRAY_STATUS: usize = 8;

/// Drops whatever is waiting on the receive side of a port.
///
/// Called before every request so a reply that arrived after its read timed
/// out cannot be taken for the answer to the next request.
pub trait ClearInput {
    fn clear_input(&mut self) -> io::Result<()>;
}

impl ClearInput for Box<dyn SerialPort> {
    fn clear_input(&mut self) -> io::Result<()> {
        self.clear(ClearBuffer::Input)?;
        Ok(())
    }
}

/// [`ActuatorChannel`] speaking Dynamixel Protocol 2.0 over a serial port.
#[derive(Debug)]
pub struct DynamixelChannel<P> {
    port: Option<P>,
    default_table: ControlTable,
    tables: HashMap<JointId, ControlTable>,
}

impl DynamixelChannel<Box<dyn SerialPort>> {
    /// Opens the port and sets the bit rate. Either failure is a link fault.
    pub fn open(config: &DynamixelChannelConfig) -> Result<Self, Error> {
        let mut port = serialport::new(&config.port_path, config.baud_rate)
            .timeout(Duration::from_millis(config.timeout_ms))
            .open()
            .map_err(|e| Error::Link {
                path: config.port_path.clone(),
                message: format!("Failed to open the port: {e}"),
            })?;
        info!("Succeeded to open the port {}", config.port_path);
        port.set_baud_rate(config.baud_rate)
            .map_err(|e| Error::Link {
                path: config.port_path.clone(),
                message: format!("Failed to change the baudrate to {}: {e}", config.baud_rate),
            })?;
        info!("Succeeded to change the baudrate to {}", config.baud_rate);
        Ok(Self::new(port))
    }
}

impl<P> DynamixelChannel<P>
where
    P: Read + Write + ClearInput,
{
    pub fn new(port: P) -> Self {
        Self {
            port: Some(port),
            default_table: ControlTable::default(),
            tables: HashMap::new(),
        }
    }

    /// Table used for joints without their own entry.
    pub fn set_default_control_table(&mut self, table: ControlTable) {
        self.default_table = table;
    }

    pub fn set_control_table(&mut self, joint: JointId, table: ControlTable) {
        self.tables.insert(joint, table);
    }

    pub fn control_table(&self, joint: JointId) -> ControlTable {
        self.tables
            .get(&joint)
            .copied()
            .unwrap_or(self.default_table)
    }

    pub fn port(&self) -> Option<&P> {
        self.port.as_ref()
    }

    pub fn port_mut(&mut self) -> Option<&mut P> {
        self.port.as_mut()
    }

    /// Returns the model number.
    pub fn ping(&mut self, id: u8) -> Result<u16, ChannelFault> {
        let status = self.transact(id, Instruction::Ping, &[])?;
        match status.params[..] {
            [lo, hi, ..] => Ok(u16::from_le_bytes([lo, hi])),
            _ => Err(CommFault::RxCorrupt("ping status without model number".into()).into()),
        }
    }

    pub fn write1(&mut self, id: u8, address: u16, value: u8) -> Result<(), ChannelFault> {
        self.transact(id, Instruction::Write, &packet::write_params(address, &[value]))?;
        Ok(())
    }

    pub fn write4(&mut self, id: u8, address: u16, value: u32) -> Result<(), ChannelFault> {
        self.transact(
            id,
            Instruction::Write,
            &packet::write_params(address, &value.to_le_bytes()),
        )?;
        Ok(())
    }

    pub fn read4(&mut self, id: u8, address: u16) -> Result<u32, ChannelFault> {
        let status = self.transact(id, Instruction::Read, &packet::read_params(address, 4))?;
        match status.params[..] {
            [b0, b1, b2, b3] => Ok(u32::from_le_bytes([b0, b1, b2, b3])),
            _ => Err(CommFault::RxCorrupt(format!(
                "expected 4 data bytes, got {}",
                status.params.len()
            ))
            .into()),
        }
    }

    fn transact(
        &mut self,
        id: u8,
        instruction: Instruction,
        params: &[u8],
    ) -> Result<StatusPacket, ChannelFault> {
        let port = self.port.as_mut().ok_or(CommFault::PortClosed)?;
        if let Err(e) = port.clear_input() {
            warn!("failed to clear the receive buffer: {e}");
        }
        let request = packet::encode_instruction(id, instruction, params);
        trace!(?request, "tx");
        port.write_all(&request)
            .and_then(|()| port.flush())
            .map_err(|e| CommFault::TxFail(e.to_string()))?;

        let mut stray = 0;
        let status = loop {
            let status = packet::read_status(port)?;
            trace!(?status, "rx");
            if status.id == id {
                break status;
            }
            debug!("discarding status from ID:{:03} while waiting for ID:{id:03}", status.id);
            stray += 1;
            if stray >= MAX_STRAY_STATUS {
                return Err(CommFault::WrongId {
                    expected: id,
                    actual: status.id,
                }
                .into());
            }
        };
        status.check_error()?;
        Ok(status)
    }
}

impl<P> ActuatorChannel for DynamixelChannel<P>
where
    P: Read + Write + ClearInput,
{
    fn set_torque_enabled(&mut self, joint: JointId, enabled: bool) -> Result<(), ChannelFault> {
        let address = self.control_table(joint).torque_enable;
        let value = if enabled {
            TORQUE_ENABLE
        } else {
            TORQUE_DISABLE
        };
        self.write1(joint.0, address, value)
    }

    fn set_goal_position(
        &mut self,
        joint: JointId,
        position: PositionCount,
    ) -> Result<(), ChannelFault> {
        let address = self.control_table(joint).goal_position;
        self.write4(joint.0, address, position as u32)
    }

    fn present_position(&mut self, joint: JointId) -> Result<PositionCount, ChannelFault> {
        let address = self.control_table(joint).present_position;
        Ok(self.read4(joint.0, address)? as PositionCount)
    }

    fn close(&mut self) {
        if self.port.take().is_some() {
            debug!("port closed");
        }
    }
}
