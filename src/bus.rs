use crate::error::{Error, Result};

const RAM_SIZE: usize = 0x0800;
const RAM_MIRROR_END: u16 = 0x1FFF;
const IO_START: u16 = 0x2000;
const IO_END: u16 = 0x7FFF;
const PRG_START: u16 = 0x8000;
pub const PRG_SIZE: usize = 0x8000;

/// `Bus` is the memory interface the CPU core depends on. Implementations are
/// responsible for mirroring and for rejecting ROM writes; the CPU never reasons about
/// physical backing, only about 16-bit addresses.
pub trait Bus {
    fn read(&self, address: u16) -> u8;

    fn write(&mut self, address: u16, value: u8) -> Result<()>;

    /// Reads a little-endian word from `address`/`address+1`.
    fn read_u16(&self, address: u16) -> u16 {
        let lo = self.read(address);
        let hi = self.read(address.wrapping_add(1));
        u16::from_le_bytes([lo, hi])
    }
}

/// Dispatched for addresses in `$2000-$7FFF` ahead of the backing-RAM fallback. Returning
/// `None`/`false` lets `SystemBus` fall through to plain RAM, so an embedder can hand the
/// CPU core a PPU/mapper seam without this crate knowing anything about PPUs or mappers.
pub trait IoHandler {
    fn read(&self, address: u16) -> Option<u8>;

    fn write(&mut self, address: u16, value: u8) -> bool;
}

/// The no-op handler used when no I/O device is attached. `$2000-$7FFF` behaves as plain
/// RAM, matching the base spec's documented ambiguity: real hardware has PPU/APU
/// registers there, but without an attached handler this crate treats the region as
/// read-returns-last-write storage.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoIoHandler;

impl IoHandler for NoIoHandler {
    fn read(&self, _address: u16) -> Option<u8> {
        None
    }

    fn write(&mut self, _address: u16, _value: u8) -> bool {
        false
    }
}

/// The NES memory map: 2 KiB of internal RAM mirrored through `$0800-$1FFF`, an optional
/// I/O seam over `$2000-$7FFF`, and a flat 32 KiB PRG-ROM bank filling `$8000-$FFFF`.
pub struct SystemBus<H: IoHandler = NoIoHandler> {
    ram: [u8; RAM_SIZE],
    io_ram: [u8; (IO_END - IO_START + 1) as usize],
    prg: [u8; PRG_SIZE],
    io: H,
}

impl SystemBus<NoIoHandler> {
    /// Builds a bus from an exact 32 KiB PRG-ROM image with no I/O handler attached.
    pub fn new(prg: [u8; PRG_SIZE]) -> SystemBus<NoIoHandler> {
        SystemBus::with_io_handler(prg, NoIoHandler)
    }
}

impl<H: IoHandler> SystemBus<H> {
    /// RAM and the I/O-region fallback storage power on filled with `0xFF`, matching real
    /// hardware's open-bus behaviour at reset.
    pub fn with_io_handler(prg: [u8; PRG_SIZE], io: H) -> SystemBus<H> {
        SystemBus {
            ram: [0xFF; RAM_SIZE],
            io_ram: [0xFF; (IO_END - IO_START + 1) as usize],
            prg,
            io,
        }
    }

    /// The canonical RAM cell a mirrored address resolves to. Invariant 4: any read from
    /// `$0800-$1FFF` returns the byte at `address mod 0x0800`.
    fn mirror(address: u16) -> usize {
        (address as usize) % RAM_SIZE
    }
}

impl<H: IoHandler> Bus for SystemBus<H> {
    fn read(&self, address: u16) -> u8 {
        match address {
            0x0000..=RAM_MIRROR_END => self.ram[Self::mirror(address)],
            IO_START..=IO_END => self
                .io
                .read(address)
                .unwrap_or(self.io_ram[(address - IO_START) as usize]),
            _ => self.prg[(address - PRG_START) as usize],
        }
    }

    fn write(&mut self, address: u16, value: u8) -> Result<()> {
        match address {
            0x0000..=RAM_MIRROR_END => {
                self.ram[Self::mirror(address)] = value;
                Ok(())
            }
            IO_START..=IO_END => {
                if !self.io.write(address, value) {
                    self.io_ram[(address - IO_START) as usize] = value;
                }
                Ok(())
            }
            _ => Err(Error::RomWriteFault {
                pc: 0,
                address,
                value,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bus() -> SystemBus {
        SystemBus::new([0; PRG_SIZE])
    }

    #[test]
    fn never_written_ram_and_io_region_read_as_0xff() {
        let bus = bus();
        assert_eq!(bus.read(0x0010), 0xFF);
        assert_eq!(bus.read(0x2010), 0xFF);
    }

    #[test]
    fn ram_mirrors_read_and_write_through_to_canonical_cell() {
        let mut bus = bus();
        bus.write(0x0042, 0xAB).unwrap();

        assert_eq!(bus.read(0x0042), 0xAB);
        assert_eq!(bus.read(0x0842), 0xAB);
        assert_eq!(bus.read(0x1042), 0xAB);
        assert_eq!(bus.read(0x1842), 0xAB);
    }

    #[test]
    fn writing_through_a_mirror_is_observed_at_the_canonical_address() {
        let mut bus = bus();
        bus.write(0x1842, 0x7F).unwrap();

        assert_eq!(bus.read(0x0042), 0x7F);
    }

    #[test]
    fn writes_above_prg_start_are_rom_write_faults() {
        let mut bus = bus();
        let err = bus.write(0x8000, 0x01).unwrap_err();
        match err {
            Error::RomWriteFault { address, value, .. } => {
                assert_eq!(address, 0x8000);
                assert_eq!(value, 0x01);
            }
            other => panic!("expected RomWriteFault, got {other:?}"),
        }

        let err = bus.write(0xFFFF, 0x01).unwrap_err();
        assert!(matches!(err, Error::RomWriteFault { address: 0xFFFF, .. }));
    }

    #[test]
    fn io_region_without_a_handler_behaves_as_plain_ram() {
        let mut bus = bus();
        bus.write(0x2000, 0x99).unwrap();
        assert_eq!(bus.read(0x2000), 0x99);
        // Writes there must not fault.
        bus.write(0x7FFF, 0x01).unwrap();
    }

    #[test]
    fn read_u16_is_little_endian() {
        let mut bus = bus();
        bus.write(0x0010, 0x34).unwrap();
        bus.write(0x0011, 0x12).unwrap();
        assert_eq!(bus.read_u16(0x0010), 0x1234);
    }

    struct RecordingIo {
        last_write: Option<(u16, u8)>,
    }

    impl IoHandler for RecordingIo {
        fn read(&self, address: u16) -> Option<u8> {
            if address == 0x2002 {
                Some(0x42)
            } else {
                None
            }
        }

        fn write(&mut self, address: u16, value: u8) -> bool {
            self.last_write = Some((address, value));
            true
        }
    }

    #[test]
    fn io_handler_takes_priority_over_backing_ram() {
        let mut bus = SystemBus::with_io_handler([0; PRG_SIZE], RecordingIo { last_write: None });
        assert_eq!(bus.read(0x2002), 0x42);

        bus.write(0x2003, 0x55).unwrap();
        assert_eq!(bus.io.last_write, Some((0x2003, 0x55)));
    }
}
