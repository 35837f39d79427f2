//! # T31 Clock Table
//!
//! Canonical clock description for the Ingenic T31 (XBurst) CPM register
//! block: two crystal inputs, three PLLs sharing one field layout, the
//! CPCCR mux/divider cluster feeding CPU and bus clocks, per-peripheral
//! mux+divider pairs, two fractional audio dividers and the CLKGR/CLKGR1
//! gate banks.
//!
//! The table is plain data; [`registry`] validates it once and the tree
//! builder does the rest.

use static_assertions::const_assert_eq;

use crate::error::BuildError;
use crate::registry::{
    BusDivDesc, BusDivMode, ClockDesc, ClockFlags, ClockId, DivDesc, DivEntry, FracDesc,
    GateDesc, GateFlags, MuxDesc, PllDesc, PllRate, Registry, MAX_PARENTS,
};

// ============================================================================
// CPM Register Offsets
// ============================================================================

/// Clock control (CPU/L2C/AHB muxes and bus dividers).
pub const CPM_CPCCR: u32 = 0x00;
/// APLL control.
pub const CPM_CPAPCR: u32 = 0x10;
/// MPLL control.
pub const CPM_CPMPCR: u32 = 0x14;
/// VPLL control.
pub const CPM_CPVPCR: u32 = 0x1c;
/// Clock gate register 0.
pub const CPM_CLKGR: u32 = 0x30;
/// Oscillator and power control.
pub const CPM_OPCR: u32 = 0x34;
/// Clock gate register 1.
pub const CPM_CLKGR1: u32 = 0x38;
/// DDR clock divider.
pub const CPM_DDRCDR: u32 = 0x3c;
/// I2S transmit clock divider.
pub const CPM_I2STCDR: u32 = 0x60;
/// LCD pixel clock divider.
pub const CPM_LPCDR: u32 = 0x64;
/// RSA clock divider.
pub const CPM_RSACDR: u32 = 0x80;
/// SSI/SFC clock divider.
pub const CPM_SSICDR: u32 = 0x8c;
/// MSC0 clock divider.
pub const CPM_MSC0CDR: u32 = 0x98;
/// MSC1 clock divider.
pub const CPM_MSC1CDR: u32 = 0x9c;
/// I2S receive clock divider.
pub const CPM_I2SRCDR: u32 = 0xa8;
/// CIM clock divider.
pub const CPM_CIMCDR: u32 = 0xb0;
/// ISP clock divider.
pub const CPM_ISPCDR: u32 = 0xb4;
/// EL150 video codec clock divider.
pub const CPM_EL150CDR: u32 = 0xb8;
/// MAC PHY clock divider.
pub const CPM_MACCDR: u32 = 0xc0;
/// Clock status (bus divider busy bits).
pub const CPM_CPCSR: u32 = 0xec;

// ============================================================================
// Clock Ids
// ============================================================================

/// 24 MHz crystal.
pub const CLK_EXT: ClockId = ClockId::new(0);
/// 32.768 kHz RTC crystal.
pub const CLK_RTC_EXT: ClockId = ClockId::new(1);
/// Application PLL.
pub const CLK_PLL_APLL: ClockId = ClockId::new(2);
/// Memory PLL.
pub const CLK_PLL_MPLL: ClockId = ClockId::new(3);
/// Video PLL.
pub const CLK_PLL_VPLL: ClockId = ClockId::new(4);
/// System source mux A.
pub const CLK_MUX_SCLKA: ClockId = ClockId::new(5);
/// CPU/L2C source mux.
pub const CLK_MUX_CPU_L2C: ClockId = ClockId::new(6);
/// AHB0 source mux.
pub const CLK_MUX_AHB0: ClockId = ClockId::new(7);
/// AHB2 source mux.
pub const CLK_MUX_AHB2: ClockId = ClockId::new(8);
/// DDR source mux.
pub const CLK_MUX_DDR: ClockId = ClockId::new(9);
/// EL150 source mux.
pub const CLK_MUX_EL150: ClockId = ClockId::new(10);
/// RSA source mux.
pub const CLK_MUX_RSA: ClockId = ClockId::new(11);
/// MAC PHY source mux.
pub const CLK_MUX_MACPHY: ClockId = ClockId::new(12);
/// LCD source mux.
pub const CLK_MUX_LCD: ClockId = ClockId::new(13);
/// MSC0 source mux.
pub const CLK_MUX_MSC0: ClockId = ClockId::new(14);
/// MSC1 source mux.
pub const CLK_MUX_MSC1: ClockId = ClockId::new(15);
/// SSI source mux.
pub const CLK_MUX_SSI: ClockId = ClockId::new(16);
/// I2S transmit source mux.
pub const CLK_MUX_I2ST: ClockId = ClockId::new(17);
/// ISP source mux.
pub const CLK_MUX_ISP: ClockId = ClockId::new(18);
/// I2S receive source mux.
pub const CLK_MUX_I2SR: ClockId = ClockId::new(19);
/// CIM source mux.
pub const CLK_MUX_CIM: ClockId = ClockId::new(20);
/// CPU clock divider.
pub const CLK_DIV_CPU: ClockId = ClockId::new(21);
/// L2 cache clock divider.
pub const CLK_DIV_L2C: ClockId = ClockId::new(22);
/// AHB0 bus divider.
pub const CLK_DIV_AHB0: ClockId = ClockId::new(23);
/// AHB2 bus divider.
pub const CLK_DIV_AHB2: ClockId = ClockId::new(24);
/// APB bus divider.
pub const CLK_DIV_APB: ClockId = ClockId::new(25);
/// CPU+L2C pair, equal rates.
pub const CLK_DIV_CPU_L2C_X1: ClockId = ClockId::new(26);
/// CPU+L2C pair, L2C at half rate.
pub const CLK_DIV_CPU_L2C_X2: ClockId = ClockId::new(27);
/// DDR clock divider.
pub const CLK_DIV_DDR: ClockId = ClockId::new(28);
/// MAC PHY clock divider.
pub const CLK_DIV_MACPHY: ClockId = ClockId::new(29);
/// LCD pixel clock divider.
pub const CLK_DIV_LCD: ClockId = ClockId::new(30);
/// MSC0 clock divider.
pub const CLK_DIV_MSC0: ClockId = ClockId::new(31);
/// MSC1 clock divider.
pub const CLK_DIV_MSC1: ClockId = ClockId::new(32);
/// SFC clock divider.
pub const CLK_DIV_SFC: ClockId = ClockId::new(33);
/// SSI clock divider.
pub const CLK_DIV_SSI: ClockId = ClockId::new(34);
/// CIM clock divider.
pub const CLK_DIV_CIM: ClockId = ClockId::new(35);
/// ISP clock divider.
pub const CLK_DIV_ISP: ClockId = ClockId::new(36);
/// RSA clock divider.
pub const CLK_DIV_RSA: ClockId = ClockId::new(37);
/// EL150 clock divider.
pub const CLK_DIV_EL150: ClockId = ClockId::new(38);
/// I2S transmit fractional divider.
pub const CLK_DIV_I2ST: ClockId = ClockId::new(39);
/// I2S receive fractional divider.
pub const CLK_DIV_I2SR: ClockId = ClockId::new(40);
/// DDR gate.
pub const CLK_GATE_DDR: ClockId = ClockId::new(41);
/// TCU gate.
pub const CLK_GATE_TCU: ClockId = ClockId::new(42);
/// DES gate.
pub const CLK_GATE_DES: ClockId = ClockId::new(43);
/// RSA gate.
pub const CLK_GATE_RSA: ClockId = ClockId::new(44);
/// RISC-V coprocessor gate.
pub const CLK_GATE_RISCV: ClockId = ClockId::new(45);
/// MIPI CSI gate.
pub const CLK_GATE_MIPI_CSI: ClockId = ClockId::new(46);
/// LCD gate.
pub const CLK_GATE_LCD: ClockId = ClockId::new(47);
/// ISP gate.
pub const CLK_GATE_ISP: ClockId = ClockId::new(48);
/// PDMA gate.
pub const CLK_GATE_PDMA: ClockId = ClockId::new(49);
/// SFC gate.
pub const CLK_GATE_SFC: ClockId = ClockId::new(50);
/// SSI1 gate.
pub const CLK_GATE_SSI1: ClockId = ClockId::new(51);
/// Hash engine gate.
pub const CLK_GATE_HASH: ClockId = ClockId::new(52);
/// Slave bus gate.
pub const CLK_GATE_SLV: ClockId = ClockId::new(53);
/// UART2 gate.
pub const CLK_GATE_UART2: ClockId = ClockId::new(54);
/// UART1 gate.
pub const CLK_GATE_UART1: ClockId = ClockId::new(55);
/// UART0 gate.
pub const CLK_GATE_UART0: ClockId = ClockId::new(56);
/// SADC gate.
pub const CLK_GATE_SADC: ClockId = ClockId::new(57);
/// DMIC gate.
pub const CLK_GATE_DMIC: ClockId = ClockId::new(58);
/// AIC gate.
pub const CLK_GATE_AIC: ClockId = ClockId::new(59);
/// I2C1 gate.
pub const CLK_GATE_SMB1: ClockId = ClockId::new(60);
/// I2C0 gate.
pub const CLK_GATE_SMB0: ClockId = ClockId::new(61);
/// SSI0 gate.
pub const CLK_GATE_SSI0: ClockId = ClockId::new(62);
/// MSC1 gate.
pub const CLK_GATE_MSC1: ClockId = ClockId::new(63);
/// MSC0 gate.
pub const CLK_GATE_MSC0: ClockId = ClockId::new(64);
/// USB OTG gate.
pub const CLK_GATE_OTG: ClockId = ClockId::new(65);
/// EFUSE gate.
pub const CLK_GATE_EFUSE: ClockId = ClockId::new(66);
/// NEMC gate.
pub const CLK_GATE_NEMC: ClockId = ClockId::new(67);
/// CPU gate.
pub const CLK_GATE_CPU: ClockId = ClockId::new(68);
/// APB0 gate.
pub const CLK_GATE_APB0: ClockId = ClockId::new(69);
/// OS timer gate.
pub const CLK_GATE_OST: ClockId = ClockId::new(70);
/// AHB0 gate.
pub const CLK_GATE_AHB0: ClockId = ClockId::new(71);
/// AHB1 gate.
pub const CLK_GATE_AHB1: ClockId = ClockId::new(72);
/// AES gate.
pub const CLK_GATE_AES: ClockId = ClockId::new(73);
/// GMAC gate.
pub const CLK_GATE_GMAC: ClockId = ClockId::new(74);
/// IPU gate.
pub const CLK_GATE_IPU: ClockId = ClockId::new(75);
/// DTRNG gate.
pub const CLK_GATE_DTRNG: ClockId = ClockId::new(76);
/// EL150 gate.
pub const CLK_GATE_EL150: ClockId = ClockId::new(77);
/// I2S transmit clock enable (active-high CE bit).
pub const CLK_CE_I2ST: ClockId = ClockId::new(78);
/// I2S receive clock enable (active-high CE bit).
pub const CLK_CE_I2SR: ClockId = ClockId::new(79);
/// USB PHY gate.
pub const CLK_GATE_USBPHY: ClockId = ClockId::new(80);

/// Number of clock nodes.
pub const CLK_COUNT: usize = 81;

// ============================================================================
// PLL Description
// ============================================================================

/// Output-divider decode table: field value -> divider, 0 = undefined.
pub const T31_PLL_OD_ENCODING: &[u32] = &[0, 1, 2, 3, 4, 0, 6, 8];

/// Shared PLL rate table (the T31 PLLs use one field layout and one set
/// of book rates).
pub const T31_PLL_RATES: &[PllRate] = &[
    PllRate { rate: 1_500_000_000, m: 125, n: 1, od1: 2, od0: 1 },
    PllRate { rate: 1_404_000_000, m: 117, n: 1, od1: 2, od0: 1 },
    PllRate { rate: 1_392_000_000, m: 116, n: 1, od1: 2, od0: 1 },
    PllRate { rate: 1_296_000_000, m: 108, n: 1, od1: 2, od0: 1 },
    PllRate { rate: 1_200_000_000, m: 100, n: 1, od1: 2, od0: 1 },
    PllRate { rate: 1_000_000_000, m: 125, n: 1, od1: 3, od0: 1 },
    PllRate { rate: 900_000_000, m: 75, n: 1, od1: 2, od0: 1 },
    PllRate { rate: 891_000_000, m: 297, n: 4, od1: 2, od0: 1 },
    PllRate { rate: 864_000_000, m: 72, n: 1, od1: 2, od0: 1 },
    PllRate { rate: 600_000_000, m: 75, n: 1, od1: 3, od0: 1 },
];

const fn pll_desc(reg: u32) -> PllDesc {
    PllDesc {
        reg,
        m_shift: 20,
        m_width: 12,
        n_shift: 14,
        n_width: 6,
        od1_shift: 11,
        od1_width: 3,
        od0_shift: 8,
        od0_width: 3,
        enable_bit: 0,
        stable_bit: 3,
        od_encoding: T31_PLL_OD_ENCODING,
        rate_table: T31_PLL_RATES,
    }
}

// ============================================================================
// Mux / Divider / Gate Helpers
// ============================================================================

/// Slot 0 is the hardware "stop" position.
const P_STOP_EXT_APLL: [Option<ClockId>; MAX_PARENTS] =
    [None, Some(CLK_EXT), Some(CLK_PLL_APLL), None];
const P_STOP_SCLKA_MPLL: [Option<ClockId>; MAX_PARENTS] =
    [None, Some(CLK_MUX_SCLKA), Some(CLK_PLL_MPLL), None];
const P_SCLKA_MPLL_VPLL: [Option<ClockId>; MAX_PARENTS] = [
    Some(CLK_MUX_SCLKA),
    Some(CLK_PLL_MPLL),
    Some(CLK_PLL_VPLL),
    None,
];

const fn cpccr_mux(shift: u8) -> MuxDesc {
    MuxDesc {
        reg: CPM_CPCCR,
        shift,
        width: 2,
    }
}

const fn periph_mux(reg: u32) -> MuxDesc {
    MuxDesc {
        reg,
        shift: 30,
        width: 2,
    }
}

const fn cpccr_bus_div(shift1: u8, ce_bit: u8, busy_bit: u8, mode: BusDivMode) -> BusDivDesc {
    BusDivDesc {
        reg: CPM_CPCCR,
        shift1,
        width1: 4,
        shift2: 4,
        width2: 4,
        ce_bit,
        busy_reg: CPM_CPCSR,
        busy_bit,
        mode,
    }
}

const fn plain_div(reg: u32, shift: u8, width: u8) -> DivDesc {
    DivDesc {
        reg,
        shift,
        width,
        ce_bit: None,
        busy_bit: None,
        stop_bit: None,
        table: None,
    }
}

/// MSC dividers step in units of 4: div = (value + 1) * 4.
const fn msc_div_table() -> [DivEntry; 16] {
    let mut table = [DivEntry { value: 0, div: 0 }; 16];
    let mut i = 0;
    while i < 16 {
        table[i] = DivEntry {
            value: i as u32,
            div: (i as u32 + 1) * 4,
        };
        i += 1;
    }
    table
}

const MSC_DIV_TABLE: [DivEntry; 16] = msc_div_table();

const fn msc_div(reg: u32) -> DivDesc {
    DivDesc {
        reg,
        shift: 8,
        width: 4,
        ce_bit: None,
        busy_bit: None,
        stop_bit: None,
        table: Some(&MSC_DIV_TABLE),
    }
}

const fn frac_div(reg: u32) -> FracDesc {
    FracDesc {
        reg,
        m_shift: 20,
        m_width: 9,
        n_shift: 0,
        n_width: 20,
    }
}

const fn clkgr_gate(reg: u32, bit: u8) -> GateDesc {
    GateDesc {
        reg,
        bit,
        flags: GateFlags::SET_TO_DISABLE,
    }
}

const fn ce_gate(reg: u32, bit: u8) -> GateDesc {
    GateDesc {
        reg,
        bit,
        flags: GateFlags::empty(),
    }
}

// ============================================================================
// The Table
// ============================================================================

/// Every T31 clock node, in id order.
pub const T31_CLOCKS: [ClockDesc; CLK_COUNT] = [
    // Fixed-rate sources
    ClockDesc::fixed(CLK_EXT, "ext", 24_000_000),
    ClockDesc::fixed(CLK_RTC_EXT, "rtc_ext", 32_768),
    // PLLs
    ClockDesc::pll(CLK_PLL_APLL, "apll", CLK_EXT, pll_desc(CPM_CPAPCR)),
    ClockDesc::pll(CLK_PLL_MPLL, "mpll", CLK_EXT, pll_desc(CPM_CPMPCR)),
    ClockDesc::pll(CLK_PLL_VPLL, "vpll", CLK_EXT, pll_desc(CPM_CPVPCR)),
    // Muxes
    ClockDesc::mux(CLK_MUX_SCLKA, "sclka", P_STOP_EXT_APLL, cpccr_mux(30)),
    ClockDesc::mux(CLK_MUX_CPU_L2C, "mux_cpu_l2c", P_STOP_SCLKA_MPLL, cpccr_mux(28)),
    ClockDesc::mux(CLK_MUX_AHB0, "mux_ahb0", P_STOP_SCLKA_MPLL, cpccr_mux(26)),
    ClockDesc::mux(CLK_MUX_AHB2, "mux_ahb2", P_STOP_SCLKA_MPLL, cpccr_mux(24)),
    ClockDesc::mux(CLK_MUX_DDR, "mux_ddr", P_SCLKA_MPLL_VPLL, periph_mux(CPM_DDRCDR)),
    ClockDesc::mux(CLK_MUX_EL150, "mux_el150", P_SCLKA_MPLL_VPLL, periph_mux(CPM_EL150CDR)),
    ClockDesc::mux(CLK_MUX_RSA, "mux_rsa", P_SCLKA_MPLL_VPLL, periph_mux(CPM_RSACDR)),
    ClockDesc::mux(CLK_MUX_MACPHY, "mux_macphy", P_SCLKA_MPLL_VPLL, periph_mux(CPM_MACCDR)),
    ClockDesc::mux(CLK_MUX_LCD, "mux_lcd", P_SCLKA_MPLL_VPLL, periph_mux(CPM_LPCDR)),
    ClockDesc::mux(CLK_MUX_MSC0, "mux_msc0", P_SCLKA_MPLL_VPLL, periph_mux(CPM_MSC0CDR)),
    ClockDesc::mux(CLK_MUX_MSC1, "mux_msc1", P_SCLKA_MPLL_VPLL, periph_mux(CPM_MSC1CDR)),
    ClockDesc::mux(CLK_MUX_SSI, "mux_ssi", P_SCLKA_MPLL_VPLL, periph_mux(CPM_SSICDR)),
    ClockDesc::mux(CLK_MUX_I2ST, "mux_i2st", P_SCLKA_MPLL_VPLL, periph_mux(CPM_I2STCDR)),
    ClockDesc::mux(CLK_MUX_ISP, "mux_isp", P_SCLKA_MPLL_VPLL, periph_mux(CPM_ISPCDR)),
    ClockDesc::mux(CLK_MUX_I2SR, "mux_i2sr", P_SCLKA_MPLL_VPLL, periph_mux(CPM_I2SRCDR)),
    ClockDesc::mux(CLK_MUX_CIM, "mux_cim", P_SCLKA_MPLL_VPLL, periph_mux(CPM_CIMCDR)),
    // Bus dividers (CPCCR fields, CPCSR busy bits)
    ClockDesc::bus_div(
        CLK_DIV_CPU,
        "div_cpu",
        CLK_MUX_CPU_L2C,
        cpccr_bus_div(0, 22, 0, BusDivMode::Single),
    ),
    ClockDesc::bus_div(
        CLK_DIV_L2C,
        "div_l2c",
        CLK_MUX_CPU_L2C,
        cpccr_bus_div(4, 22, 0, BusDivMode::Single),
    ),
    ClockDesc::bus_div(
        CLK_DIV_AHB0,
        "div_ahb0",
        CLK_MUX_AHB0,
        cpccr_bus_div(8, 21, 1, BusDivMode::Single),
    ),
    ClockDesc::bus_div(
        CLK_DIV_AHB2,
        "div_ahb2",
        CLK_MUX_AHB2,
        cpccr_bus_div(12, 20, 2, BusDivMode::Single),
    ),
    ClockDesc::bus_div(
        CLK_DIV_APB,
        "div_apb",
        CLK_MUX_AHB2,
        cpccr_bus_div(16, 20, 2, BusDivMode::Single),
    ),
    ClockDesc::bus_div(
        CLK_DIV_CPU_L2C_X1,
        "div_cpu_l2c_x1",
        CLK_MUX_CPU_L2C,
        cpccr_bus_div(0, 22, 0, BusDivMode::Dual),
    ),
    ClockDesc::bus_div(
        CLK_DIV_CPU_L2C_X2,
        "div_cpu_l2c_x2",
        CLK_MUX_CPU_L2C,
        cpccr_bus_div(0, 22, 0, BusDivMode::DualHalf),
    ),
    // Peripheral dividers
    ClockDesc::div(CLK_DIV_DDR, "div_ddr", CLK_MUX_DDR, plain_div(CPM_DDRCDR, 0, 4)),
    ClockDesc::div(CLK_DIV_MACPHY, "div_macphy", CLK_MUX_MACPHY, plain_div(CPM_MACCDR, 8, 4)),
    ClockDesc::div(CLK_DIV_LCD, "div_lcd", CLK_MUX_LCD, plain_div(CPM_LPCDR, 8, 5)),
    ClockDesc::div(CLK_DIV_MSC0, "div_msc0", CLK_MUX_MSC0, msc_div(CPM_MSC0CDR)),
    ClockDesc::div(CLK_DIV_MSC1, "div_msc1", CLK_MUX_MSC1, msc_div(CPM_MSC1CDR)),
    ClockDesc::div(CLK_DIV_SFC, "div_sfc", CLK_MUX_SSI, plain_div(CPM_SSICDR, 8, 4)),
    ClockDesc::div(CLK_DIV_SSI, "div_ssi", CLK_MUX_SSI, plain_div(CPM_SSICDR, 8, 4)),
    ClockDesc::div(CLK_DIV_CIM, "div_cim", CLK_MUX_CIM, plain_div(CPM_CIMCDR, 8, 4)),
    ClockDesc::div(CLK_DIV_ISP, "div_isp", CLK_MUX_ISP, plain_div(CPM_ISPCDR, 4, 4)),
    ClockDesc::div(CLK_DIV_RSA, "div_rsa", CLK_MUX_RSA, plain_div(CPM_RSACDR, 4, 4)),
    ClockDesc::div(CLK_DIV_EL150, "div_el150", CLK_MUX_EL150, plain_div(CPM_EL150CDR, 4, 4)),
    // Fractional dividers (audio)
    ClockDesc::frac_div(CLK_DIV_I2ST, "div_i2st", CLK_MUX_I2ST, frac_div(CPM_I2STCDR)),
    ClockDesc::frac_div(CLK_DIV_I2SR, "div_i2sr", CLK_MUX_I2SR, frac_div(CPM_I2SRCDR)),
    // Gates, CLKGR bank
    ClockDesc::gate(CLK_GATE_DDR, "gate_ddr", CLK_DIV_DDR, clkgr_gate(CPM_CLKGR, 31))
        .with_flags(ClockFlags::CRITICAL),
    ClockDesc::gate(CLK_GATE_TCU, "gate_tcu", CLK_DIV_APB, clkgr_gate(CPM_CLKGR, 30)),
    ClockDesc::gate(CLK_GATE_DES, "gate_des", CLK_DIV_APB, clkgr_gate(CPM_CLKGR, 28)),
    ClockDesc::gate(CLK_GATE_RSA, "gate_rsa", CLK_DIV_RSA, clkgr_gate(CPM_CLKGR, 27)),
    ClockDesc::gate(CLK_GATE_RISCV, "gate_riscv", CLK_DIV_APB, clkgr_gate(CPM_CLKGR, 26)),
    ClockDesc::gate(CLK_GATE_MIPI_CSI, "gate_csi", CLK_DIV_AHB0, clkgr_gate(CPM_CLKGR, 25)),
    ClockDesc::gate(CLK_GATE_LCD, "gate_lcd", CLK_DIV_LCD, clkgr_gate(CPM_CLKGR, 24)),
    ClockDesc::gate(CLK_GATE_ISP, "gate_isp", CLK_DIV_ISP, clkgr_gate(CPM_CLKGR, 23)),
    ClockDesc::gate(CLK_GATE_PDMA, "gate_pdma", CLK_DIV_AHB2, clkgr_gate(CPM_CLKGR, 21)),
    ClockDesc::gate(CLK_GATE_SFC, "gate_sfc", CLK_DIV_SFC, clkgr_gate(CPM_CLKGR, 20)),
    ClockDesc::gate(CLK_GATE_SSI1, "gate_ssi1", CLK_DIV_SSI, clkgr_gate(CPM_CLKGR, 19)),
    ClockDesc::gate(CLK_GATE_HASH, "gate_hash", CLK_DIV_AHB2, clkgr_gate(CPM_CLKGR, 18)),
    ClockDesc::gate(CLK_GATE_SLV, "gate_slv", CLK_DIV_APB, clkgr_gate(CPM_CLKGR, 17)),
    ClockDesc::gate(CLK_GATE_UART2, "gate_uart2", CLK_DIV_APB, clkgr_gate(CPM_CLKGR, 16)),
    ClockDesc::gate(CLK_GATE_UART1, "gate_uart1", CLK_DIV_APB, clkgr_gate(CPM_CLKGR, 15)),
    ClockDesc::gate(CLK_GATE_UART0, "gate_uart0", CLK_DIV_APB, clkgr_gate(CPM_CLKGR, 14)),
    ClockDesc::gate(CLK_GATE_SADC, "gate_sadc", CLK_DIV_APB, clkgr_gate(CPM_CLKGR, 13)),
    ClockDesc::gate(CLK_GATE_DMIC, "gate_dmic", CLK_DIV_APB, clkgr_gate(CPM_CLKGR, 12)),
    ClockDesc::gate(CLK_GATE_AIC, "gate_aic", CLK_DIV_I2ST, clkgr_gate(CPM_CLKGR, 11)),
    ClockDesc::gate(CLK_GATE_SMB1, "gate_i2c1", CLK_DIV_APB, clkgr_gate(CPM_CLKGR, 8)),
    ClockDesc::gate(CLK_GATE_SMB0, "gate_i2c0", CLK_DIV_APB, clkgr_gate(CPM_CLKGR, 7)),
    ClockDesc::gate(CLK_GATE_SSI0, "gate_ssi0", CLK_DIV_SSI, clkgr_gate(CPM_CLKGR, 6)),
    ClockDesc::gate(CLK_GATE_MSC1, "gate_msc1", CLK_DIV_MSC1, clkgr_gate(CPM_CLKGR, 5)),
    ClockDesc::gate(CLK_GATE_MSC0, "gate_msc0", CLK_DIV_MSC0, clkgr_gate(CPM_CLKGR, 4)),
    ClockDesc::gate(CLK_GATE_OTG, "gate_otg", CLK_DIV_AHB2, clkgr_gate(CPM_CLKGR, 3)),
    ClockDesc::gate(CLK_GATE_EFUSE, "gate_efuse", CLK_DIV_AHB2, clkgr_gate(CPM_CLKGR, 1)),
    ClockDesc::gate(CLK_GATE_NEMC, "gate_nemc", CLK_DIV_AHB2, clkgr_gate(CPM_CLKGR, 0)),
    // Gates, CLKGR1 bank
    ClockDesc::gate(CLK_GATE_CPU, "gate_cpu", CLK_DIV_CPU, clkgr_gate(CPM_CLKGR1, 15)),
    ClockDesc::gate(CLK_GATE_APB0, "gate_apb0", CLK_DIV_AHB0, clkgr_gate(CPM_CLKGR1, 14))
        .with_flags(ClockFlags::CRITICAL),
    ClockDesc::gate(CLK_GATE_OST, "gate_ost", CLK_EXT, clkgr_gate(CPM_CLKGR1, 11))
        .with_flags(ClockFlags::CRITICAL),
    ClockDesc::gate(CLK_GATE_AHB0, "gate_ahb0", CLK_DIV_AHB0, clkgr_gate(CPM_CLKGR1, 10))
        .with_flags(ClockFlags::CRITICAL),
    ClockDesc::gate(CLK_GATE_AHB1, "gate_ahb1", CLK_DIV_AHB2, clkgr_gate(CPM_CLKGR1, 6)),
    ClockDesc::gate(CLK_GATE_AES, "gate_aes", CLK_DIV_AHB2, clkgr_gate(CPM_CLKGR1, 5)),
    ClockDesc::gate(CLK_GATE_GMAC, "gate_gmac", CLK_DIV_MACPHY, clkgr_gate(CPM_CLKGR1, 4)),
    ClockDesc::gate(CLK_GATE_IPU, "gate_ipu", CLK_DIV_AHB0, clkgr_gate(CPM_CLKGR1, 2)),
    ClockDesc::gate(CLK_GATE_DTRNG, "gate_dtrng", CLK_DIV_APB, clkgr_gate(CPM_CLKGR1, 1)),
    ClockDesc::gate(CLK_GATE_EL150, "gate_el150", CLK_DIV_EL150, clkgr_gate(CPM_CLKGR1, 0)),
    // Clock-enable bits inside the audio divider registers (active high)
    ClockDesc::gate(CLK_CE_I2ST, "ce_i2st", CLK_DIV_I2ST, ce_gate(CPM_I2STCDR, 29)),
    ClockDesc::gate(CLK_CE_I2SR, "ce_i2sr", CLK_DIV_I2SR, ce_gate(CPM_I2SRCDR, 29)),
    // USB PHY gate lives in OPCR
    ClockDesc::gate(CLK_GATE_USBPHY, "gate_usbphy", CLK_DIV_APB, clkgr_gate(CPM_OPCR, 23)),
];

const_assert_eq!(T31_CLOCKS.len(), CLK_COUNT);

/// Validated registry for the T31 table.
pub fn registry() -> Result<Registry, BuildError> {
    Registry::new(&T31_CLOCKS)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ClockError, RateError, StateError};
    use crate::io::{RamRegisters, RegisterIo};
    use crate::tree::ClockTree;

    #[test]
    fn test_table_validates() {
        let registry = registry().unwrap();
        assert_eq!(registry.len(), CLK_COUNT);
    }

    #[test]
    fn test_ids_match_declaration_order() {
        for (slot, desc) in T31_CLOCKS.iter().enumerate() {
            assert_eq!(desc.id.raw() as usize, slot, "row {} out of order", slot);
        }
    }

    #[test]
    fn test_names_are_unique() {
        let registry = registry().unwrap();
        for desc in T31_CLOCKS.iter() {
            assert_eq!(registry.find(desc.name), Some(desc.id), "{}", desc.name);
        }
    }

    fn build_tree() -> ClockTree<RamRegisters> {
        ClockTree::build(registry().unwrap(), RamRegisters::new()).unwrap()
    }

    #[test]
    fn test_tree_builds_and_fixed_rates_are_live() {
        let tree = build_tree();
        assert_eq!(tree.get_rate(CLK_EXT).unwrap(), 24_000_000);
        assert_eq!(tree.get_rate(CLK_RTC_EXT).unwrap(), 32_768);
    }

    #[test]
    fn test_every_pll_rate_round_trips() {
        let tree = build_tree();
        for pll in [CLK_PLL_APLL, CLK_PLL_MPLL, CLK_PLL_VPLL] {
            for entry in T31_PLL_RATES {
                assert_eq!(tree.set_rate(pll, entry.rate).unwrap(), entry.rate);
                assert_eq!(tree.get_rate(pll).unwrap(), entry.rate, "pll {:?}", pll);
            }
        }
    }

    #[test]
    fn test_cpu_path_end_to_end() {
        let tree = build_tree();
        tree.set_rate(CLK_PLL_APLL, 1_200_000_000).unwrap();
        tree.set_parent(CLK_MUX_SCLKA, 2).unwrap(); // apll
        tree.set_parent(CLK_MUX_CPU_L2C, 1).unwrap(); // sclka
        assert_eq!(tree.get_rate(CLK_MUX_CPU_L2C).unwrap(), 1_200_000_000);

        assert_eq!(tree.set_rate(CLK_DIV_CPU, 300_000_000).unwrap(), 300_000_000);
        assert_eq!(tree.get_rate(CLK_DIV_CPU).unwrap(), 300_000_000);
        // gate_cpu follows div_cpu without a refresh call.
        assert_eq!(tree.get_rate(CLK_GATE_CPU).unwrap(), 300_000_000);
    }

    #[test]
    fn test_cpu_l2c_pair_programs_both_fields() {
        let tree = build_tree();
        tree.set_rate(CLK_PLL_APLL, 1_200_000_000).unwrap();
        tree.set_parent(CLK_MUX_SCLKA, 2).unwrap();
        tree.set_parent(CLK_MUX_CPU_L2C, 1).unwrap();

        tree.set_rate(CLK_DIV_CPU_L2C_X2, 600_000_000).unwrap();
        let state = tree.state.lock();
        assert_eq!(state.io.read_field(CPM_CPCCR, 0, 4), 1); // cpu /2
        assert_eq!(state.io.read_field(CPM_CPCCR, 4, 4), 0); // l2c /1 (half of 2)
    }

    #[test]
    fn test_bus_divider_busy_timeout() {
        let mut regs = RamRegisters::new();
        regs.set_bit(CPM_CPCSR, 0); // cpu busy bit stuck
        let tree = ClockTree::build(registry().unwrap(), regs).unwrap();
        tree.set_rate(CLK_PLL_APLL, 1_200_000_000).unwrap();
        tree.set_parent(CLK_MUX_SCLKA, 2).unwrap();
        tree.set_parent(CLK_MUX_CPU_L2C, 1).unwrap();
        assert_eq!(
            tree.set_rate(CLK_DIV_CPU, 600_000_000).unwrap_err(),
            ClockError::Rate(RateError::HardwareTimeout)
        );
    }

    #[test]
    fn test_msc_divider_uses_table() {
        let tree = build_tree();
        tree.set_rate(CLK_PLL_MPLL, 1_200_000_000).unwrap();
        tree.set_parent(CLK_MUX_MSC0, 1).unwrap(); // mpll
        let achieved = tree.set_rate(CLK_DIV_MSC0, 150_000_000).unwrap();
        assert_eq!(achieved, 150_000_000); // divisor 8 from the table
        let state = tree.state.lock();
        assert_eq!(state.io.read_field(CPM_MSC0CDR, 8, 4), 1);
    }

    #[test]
    fn test_audio_fractional_path() {
        let tree = build_tree();
        tree.set_parent(CLK_MUX_I2ST, 0).unwrap(); // sclka
        tree.set_parent(CLK_MUX_SCLKA, 1).unwrap(); // ext, 24 MHz
        let achieved = tree.set_rate(CLK_DIV_I2ST, 12_288_000).unwrap();
        assert_eq!(achieved, 12_288_000);
        // The CE bit for the same line is a separate active-high gate.
        tree.enable(CLK_CE_I2ST).unwrap();
        let state = tree.state.lock();
        assert!(state.io.test_bit(CPM_I2STCDR, 29));
    }

    #[test]
    fn test_critical_gates_enabled_at_build() {
        let tree = build_tree();
        for id in [CLK_GATE_DDR, CLK_GATE_APB0, CLK_GATE_OST, CLK_GATE_AHB0] {
            assert!(tree.is_enabled(id).unwrap(), "{:?}", id);
            assert_eq!(tree.enable_count(id).unwrap(), 1);
        }
        // Non-critical gates start disabled.
        assert!(!tree.is_enabled(CLK_GATE_UART0).unwrap());
    }

    #[test]
    fn test_uart_gate_drives_clkgr_bit() {
        let tree = build_tree();
        tree.enable(CLK_GATE_UART0).unwrap();
        assert!(!tree.state.lock().io.test_bit(CPM_CLKGR, 14));
        tree.disable(CLK_GATE_UART0).unwrap();
        assert!(tree.state.lock().io.test_bit(CPM_CLKGR, 14));
    }

    #[test]
    fn test_stop_slot_cannot_be_selected() {
        let tree = build_tree();
        assert_eq!(
            tree.set_parent(CLK_MUX_SCLKA, 0).unwrap_err(),
            ClockError::Rate(RateError::InvalidEncoding)
        );
        assert_eq!(
            tree.set_parent(CLK_DIV_CPU, 1).unwrap_err(),
            ClockError::State(StateError::NotAMux)
        );
    }

    #[test]
    fn test_dump_lists_all_nodes_in_order() {
        let tree = build_tree();
        let ids: alloc::vec::Vec<u16> = tree.iter().map(|s| s.id.raw()).collect();
        let expected: alloc::vec::Vec<u16> = (0..CLK_COUNT as u16).collect();
        assert_eq!(ids, expected);
    }

    #[test]
    fn test_lookup_by_name() {
        let tree = build_tree();
        assert_eq!(tree.lookup("gate_uart0"), Some(CLK_GATE_UART0));
        assert_eq!(tree.lookup("div_ddr"), Some(CLK_DIV_DDR));
        assert_eq!(tree.name(CLK_PLL_VPLL), Some("vpll"));
    }
}
