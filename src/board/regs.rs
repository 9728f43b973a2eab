use bitflags::bitflags;
use msp430fr2355 as pac;

/// Access to a peripheral that has already been handed out, from interrupt context or from a
/// zero-sized handle.
pub trait Steal {
    /// # Safety
    /// The caller must not race another owner on the same registers.
    unsafe fn steal() -> Self;
}

macro_rules! steal_impl {
    ($($P:ident),*) => {
        $(
            impl Steal for pac::$P {
                #[inline(always)]
                unsafe fn steal() -> Self {
                    pac::Peripherals::conjure().$P
                }
            }
        )*
    };
}

steal_impl!(P1, P2, P3, P4, P5, P6, E_USCI_A1, E_USCI_B0, E_USCI_B1, TB0, TB1, TB3);

pub trait GpioPeriph: Steal {
    fn pxin_rd(&self) -> u8;

    fn pxout_rd(&self) -> u8;
    fn pxout_wr(&self, bits: u8);
    fn pxout_set(&self, bits: u8);
    fn pxout_clear(&self, bits: u8);
    fn pxout_toggle(&self, bits: u8);

    fn pxdir_rd(&self) -> u8;
    fn pxdir_wr(&self, bits: u8);
    fn pxdir_set(&self, bits: u8);
    fn pxdir_clear(&self, bits: u8);

    fn pxsel0_set(&self, bits: u8);
    fn pxsel0_clear(&self, bits: u8);
    fn pxsel1_set(&self, bits: u8);
    fn pxsel1_clear(&self, bits: u8);
}

macro_rules! reg_methods {
    ($reg:ident, $rd:ident, $wr:ident, $set:ident, $clear:ident) => {
        #[inline(always)]
        fn $rd(&self) -> u8 {
            self.$reg.read().bits()
        }

        #[inline(always)]
        fn $wr(&self, bits: u8) {
            self.$reg.write(|w| unsafe { w.bits(bits) });
        }

        reg_methods!($reg, $set, $clear);
    };
    ($reg:ident, $set:ident, $clear:ident) => {
        #[inline(always)]
        fn $set(&self, bits: u8) {
            unsafe { self.$reg.set_bits(|w| w.bits(bits)) }
        }

        #[inline(always)]
        fn $clear(&self, bits: u8) {
            unsafe { self.$reg.clear_bits(|w| w.bits(bits)) }
        }
    };
}

macro_rules! gpio_impl {
    ($Px:ident => $pxin:ident, $pxout:ident, $pxdir:ident, $pxsel0:ident, $pxsel1:ident) => {
        impl GpioPeriph for pac::$Px {
            #[inline(always)]
            fn pxin_rd(&self) -> u8 {
                self.$pxin.read().bits()
            }

            #[inline(always)]
            fn pxout_toggle(&self, bits: u8) {
                unsafe { self.$pxout.toggle_bits(|w| w.bits(bits)) };
            }

            reg_methods!($pxout, pxout_rd, pxout_wr, pxout_set, pxout_clear);
            reg_methods!($pxdir, pxdir_rd, pxdir_wr, pxdir_set, pxdir_clear);
            reg_methods!($pxsel0, pxsel0_set, pxsel0_clear);
            reg_methods!($pxsel1, pxsel1_set, pxsel1_clear);
        }
    };
}

gpio_impl!(P1 => p1in, p1out, p1dir, p1sel0, p1sel1);
gpio_impl!(P2 => p2in, p2out, p2dir, p2sel0, p2sel1);
gpio_impl!(P3 => p3in, p3out, p3dir, p3sel0, p3sel1);
gpio_impl!(P4 => p4in, p4out, p4dir, p4sel0, p4sel1);
gpio_impl!(P5 => p5in, p5out, p5dir, p5sel0, p5sel1);
gpio_impl!(P6 => p6in, p6out, p6dir, p6sel0, p6sel1);

bitflags! {
    /// UCAxCTLW0 in UART mode.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct UcaCtlw0: u16 {
        const UCSWRST = 1 << 0;
        const UCRXEIE = 1 << 5;
        const UCSSEL_ACLK = 1 << 6;
        const UCSSEL_SMCLK = 2 << 6;
    }

    /// UCBxCTLW0, shared by SPI and I2C mode.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct UcbCtlw0: u16 {
        const UCSWRST = 1 << 0;
        const UCTXSTT = 1 << 1;
        const UCTXSTP = 1 << 2;
        const UCTR = 1 << 4;
        const UCSSEL_ACLK = 1 << 6;
        const UCSSEL_SMCLK = 2 << 6;
        const UCSYNC = 1 << 8;
        const UCMODE_I2C = 3 << 9;
        const UCMST = 1 << 11;
        const UCMSB = 1 << 13;
        const UCCKPL = 1 << 14;
        const UCCKPH = 1 << 15;
    }

    /// UCAxSTATW.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct UcaStatw: u16 {
        const UCBUSY = 1 << 0;
        const UCRXERR = 1 << 2;
        const UCBRK = 1 << 3;
        const UCPE = 1 << 4;
        const UCOE = 1 << 5;
        const UCFE = 1 << 6;
    }

    /// UCxIFG. Bit 0 and 1 are the receive and transmit flags in every mode.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct UcIfg: u16 {
        const UCRXIFG = 1 << 0;
        const UCTXIFG = 1 << 1;
        const UCSTTIFG = 1 << 2;
        const UCSTPIFG = 1 << 3;
        const UCALIFG = 1 << 4;
        const UCNACKIFG = 1 << 5;
    }

    /// TBxCTL.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct TbCtl: u16 {
        const TBIFG = 1 << 0;
        const TBIE = 1 << 1;
        const TBCLR = 1 << 2;
        const MC_UP = 1 << 4;
        const MC_CONTINUOUS = 2 << 4;
        const TBSSEL_ACLK = 1 << 8;
        const TBSSEL_SMCLK = 2 << 8;
    }

    /// TBxCCTLn.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct TbCctl: u16 {
        const CCIFG = 1 << 0;
        const COV = 1 << 1;
        const CCIE = 1 << 4;
        const OUTMOD_RESET_SET = 7 << 5;
        const CAP = 1 << 8;
        const SCS = 1 << 11;
        const CM_RISING = 1 << 14;
    }
}

/// `ID` field of TBxCTL for a divider of 1, 2, 4 or 8.
pub fn tb_id(div: u8) -> u16 {
    let log2 = match div {
        2 => 1,
        4 => 2,
        8 => 3,
        _ => 0,
    };
    log2 << 6
}

pub trait EUsci: Steal {
    fn ctlw0_rd(&self) -> u16;
    fn ctlw0_wr(&self, bits: u16);
    fn ctlw0_set(&self, bits: u16);
    fn ctlw0_clear(&self, bits: u16);

    // only call while in reset state
    fn brw_wr(&self, ucbr: u16);

    fn statw_rd(&self) -> u16;

    fn rx_rd(&self) -> u8;
    fn tx_wr(&self, val: u8);

    fn ie_set(&self, bits: u16);
    fn ie_clear(&self, bits: u16);

    fn ifg_rd(&self) -> UcIfg;
    fn ifg_clear(&self, bits: UcIfg);
}

pub trait EUsciUart: EUsci {
    // only call while in reset state
    fn mctlw_wr(&self, ucos16: bool, ucbrs: u8, ucbrf: u8);
    fn statw_wr(&self, bits: u16);
}

pub trait EUsciI2c: EUsci {
    // only call while in reset state
    fn ctlw1_wr(&self, bits: u16);
    fn tbcnt_wr(&self, count: u16);
    fn i2csa_wr(&self, address: u16);
}

macro_rules! eusci_impl {
    ($EUsci:ident, $ctlw0:ident, $brw:ident, $statw:ident, $rxbuf:ident, $txbuf:ident,
     $ie:ident, $ifg:ident) => {
        impl EUsci for pac::$EUsci {
            #[inline(always)]
            fn ctlw0_rd(&self) -> u16 {
                self.$ctlw0.read().bits()
            }

            #[inline(always)]
            fn ctlw0_wr(&self, bits: u16) {
                self.$ctlw0.write(|w| unsafe { w.bits(bits) });
            }

            #[inline(always)]
            fn ctlw0_set(&self, bits: u16) {
                unsafe { self.$ctlw0.set_bits(|w| w.bits(bits)) }
            }

            #[inline(always)]
            fn ctlw0_clear(&self, bits: u16) {
                unsafe { self.$ctlw0.clear_bits(|w| w.bits(bits)) }
            }

            #[inline(always)]
            fn brw_wr(&self, ucbr: u16) {
                self.$brw.write(|w| unsafe { w.bits(ucbr) });
            }

            #[inline(always)]
            fn statw_rd(&self) -> u16 {
                self.$statw.read().bits()
            }

            #[inline(always)]
            fn rx_rd(&self) -> u8 {
                self.$rxbuf.read().bits() as u8
            }

            #[inline(always)]
            fn tx_wr(&self, val: u8) {
                self.$txbuf.write(|w| unsafe { w.bits(u16::from(val)) });
            }

            #[inline(always)]
            fn ie_set(&self, bits: u16) {
                unsafe { self.$ie.set_bits(|w| w.bits(bits)) }
            }

            #[inline(always)]
            fn ie_clear(&self, bits: u16) {
                unsafe { self.$ie.clear_bits(|w| w.bits(bits)) }
            }

            #[inline(always)]
            fn ifg_rd(&self) -> UcIfg {
                UcIfg::from_bits_truncate(self.$ifg.read().bits())
            }

            #[inline(always)]
            fn ifg_clear(&self, bits: UcIfg) {
                unsafe { self.$ifg.clear_bits(|w| w.bits(bits.bits())) }
            }

        }
    };
}

eusci_impl!(E_USCI_A1, uca1ctlw0, uca1brw, uca1statw, uca1rxbuf, uca1txbuf, uca1ie, uca1ifg);
eusci_impl!(E_USCI_B0, ucb0ctlw0, ucb0brw, ucb0statw, ucb0rxbuf, ucb0txbuf, ucb0ie, ucb0ifg);
eusci_impl!(E_USCI_B1, ucb1ctlw0, ucb1brw, ucb1statw, ucb1rxbuf, ucb1txbuf, ucb1ie, ucb1ifg);

impl EUsciUart for pac::E_USCI_A1 {
    #[inline(always)]
    fn mctlw_wr(&self, ucos16: bool, ucbrs: u8, ucbrf: u8) {
        let bits = (u16::from(ucbrs) << 8) | (u16::from(ucbrf & 0x0F) << 4) | u16::from(ucos16);
        self.uca1mctlw.write(|w| unsafe { w.bits(bits) });
    }

    #[inline(always)]
    fn statw_wr(&self, bits: u16) {
        self.uca1statw.write(|w| unsafe { w.bits(bits) });
    }
}

impl EUsciI2c for pac::E_USCI_B0 {
    #[inline(always)]
    fn ctlw1_wr(&self, bits: u16) {
        self.ucb0ctlw1.write(|w| unsafe { w.bits(bits) });
    }

    #[inline(always)]
    fn tbcnt_wr(&self, count: u16) {
        self.ucb0tbcnt.write(|w| unsafe { w.bits(count) });
    }

    #[inline(always)]
    fn i2csa_wr(&self, address: u16) {
        self.ucb0i2csa.write(|w| unsafe { w.bits(address) });
    }
}

pub struct CCR0;
pub struct CCR1;

pub trait TimerB: Steal {
    fn ctl_rd(&self) -> u16;
    fn ctl_wr(&self, bits: u16);
    fn ctl_set(&self, bits: u16);
    fn ctl_clear(&self, bits: u16);

    /// Expansion divider, 1 to 8.
    fn ex0_wr(&self, idex: u8);

    fn iv_rd(&self) -> u16;
}

pub trait SubTimerB<CCRn>: TimerB {
    fn ccr_rd(&self) -> u16;
    fn ccr_wr(&self, count: u16);

    fn cctl_rd(&self) -> u16;
    fn cctl_wr(&self, bits: u16);
    fn cctl_set(&self, bits: u16);
    fn cctl_clear(&self, bits: u16);
}

macro_rules! subtimer_impl {
    ($CCRn:ident, $TBx:ident, $cctln:ident, $ccrn:ident) => {
        impl SubTimerB<$CCRn> for pac::$TBx {
            #[inline(always)]
            fn ccr_rd(&self) -> u16 {
                self.$ccrn.read().bits()
            }

            #[inline(always)]
            fn ccr_wr(&self, count: u16) {
                self.$ccrn.write(|w| unsafe { w.bits(count) });
            }

            #[inline(always)]
            fn cctl_rd(&self) -> u16 {
                self.$cctln.read().bits()
            }

            #[inline(always)]
            fn cctl_wr(&self, bits: u16) {
                self.$cctln.write(|w| unsafe { w.bits(bits) });
            }

            #[inline(always)]
            fn cctl_set(&self, bits: u16) {
                unsafe { self.$cctln.set_bits(|w| w.bits(bits)) }
            }

            #[inline(always)]
            fn cctl_clear(&self, bits: u16) {
                unsafe { self.$cctln.clear_bits(|w| w.bits(bits)) }
            }
        }
    };
}

macro_rules! timerb_impl {
    ($TBx:ident, $ctl:ident, $ex0:ident, $iv:ident, $([$CCRn:ident, $cctln:ident, $ccrn:ident]),*) => {
        impl TimerB for pac::$TBx {
            #[inline(always)]
            fn ctl_rd(&self) -> u16 {
                self.$ctl.read().bits()
            }

            #[inline(always)]
            fn ctl_wr(&self, bits: u16) {
                self.$ctl.write(|w| unsafe { w.bits(bits) });
            }

            #[inline(always)]
            fn ctl_set(&self, bits: u16) {
                unsafe { self.$ctl.set_bits(|w| w.bits(bits)) }
            }

            #[inline(always)]
            fn ctl_clear(&self, bits: u16) {
                unsafe { self.$ctl.clear_bits(|w| w.bits(bits)) }
            }

            #[inline(always)]
            fn ex0_wr(&self, idex: u8) {
                let bits = u16::from(idex.clamp(1, 8) - 1);
                self.$ex0.write(|w| unsafe { w.bits(bits) });
            }

            #[inline(always)]
            fn iv_rd(&self) -> u16 {
                self.$iv.read().bits()
            }
        }

        $(subtimer_impl!($CCRn, $TBx, $cctln, $ccrn);)*
    };
}

timerb_impl!(TB0, tb0ctl, tb0ex0, tb0iv, [CCR0, tb0cctl0, tb0ccr0]);
timerb_impl!(TB1, tb1ctl, tb1ex0, tb1iv, [CCR1, tb1cctl1, tb1ccr1]);
timerb_impl!(TB3, tb3ctl, tb3ex0, tb3iv, [CCR0, tb3cctl0, tb3ccr0], [CCR1, tb3cctl1, tb3ccr1]);
