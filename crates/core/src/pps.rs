use crate::registers::{pps_in, pps_out};
use crate::{Register, RegisterInterface, SpiResult};

/// Routes SCK1 to RC3, SDI1 from RC4 and SDO1 to RC5.
pub fn init<R: RegisterInterface + ?Sized>(regs: &mut R) -> SpiResult<()> {
    regs.write(Register::Rc3pps, pps_out::SCK1)?;
    regs.write(Register::Ssp1datpps, pps_in::RC4)?;
    regs.write(Register::Rc5pps, pps_out::SDO1)?;
    tracing::info!("PPS: SCK1 -> RC3, RC4 -> SDI1, SDO1 -> RC5");
    Ok(())
}
