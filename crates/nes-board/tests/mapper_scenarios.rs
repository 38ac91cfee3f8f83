//! End-to-end board scenarios driven through the factory.

use nes_board::{Board, Context, Error, Host, IRQ_DELAY, Mirroring, Mode, create};

struct ScriptHost {
    now: u64,
    irqs: Vec<u64>,
}

impl Host for ScriptHost {
    fn cycles(&self) -> u64 {
        self.now
    }
    fn mode(&self) -> Mode {
        Mode::Ntsc
    }
    fn irq(&mut self, at_cycle: u64) {
        self.irqs.push(at_cycle);
    }
    fn clear_irq(&mut self) {}
    fn connect_a12(&mut self, _: bool) {}
    fn ppu_sync(&mut self) {}
}

fn host() -> ScriptHost {
    ScriptHost {
        now: 0,
        irqs: Vec::new(),
    }
}

/// PRG bytes name their own 8K bank, CHR bytes their own 1K bank.
fn image(id: u16, prg_size: usize, chr_size: usize) -> Context {
    let prg: Vec<u8> = (0..prg_size).map(|i| (i / 0x2000) as u8).collect();
    let chr: Vec<u8> = (0..chr_size).map(|i| (i / 0x400) as u8).collect();
    Context::new(id, prg, chr)
}

#[test]
fn unsupported_mapper_fails_the_load() {
    let result = create(image(151, 32 * 1024, 8 * 1024));
    assert!(matches!(result, Err(Error::UnsupportedMapper(151))));
}

#[test]
fn mmc3_cartridge_powers_up_per_its_descriptor() {
    // 128K PRG, 64K CHR, header claiming horizontal mirroring.
    let mut ctx = image(4, 128 * 1024, 64 * 1024);
    ctx.mirroring = Mirroring::Horizontal;
    let mut host = host();
    let mut board = create(ctx).expect("create");
    board.reset(&mut host, true);

    // PRG window 0 is physical bank 0; window 3 is the last 8K bank.
    assert_eq!(board.cpu_read(0x8000), 0);
    assert_eq!(board.cpu_read(0xE000), 15);
    assert_eq!(board.cpu_read(0xFFFF), 15);

    // The board overrides the header: vertical, not horizontal.
    board.ppu_write(0x2000, 0xAA);
    assert_eq!(board.ppu_read(0x2800), 0xAA);
    assert_ne!(board.ppu_read(0x2400), 0xAA);
}

#[test]
fn mmc3_battery_cartridge_backs_work_ram() {
    let mut ctx = image(4, 128 * 1024, 64 * 1024);
    ctx.battery = true;
    let mut host = host();
    let mut board = create(ctx).expect("create");
    board.reset(&mut host, true);
    board.cpu_write(&mut host, 0x6ABC, 0x42);
    assert_eq!(board.cpu_read(0x6ABC), 0x42);
}

#[test]
fn mmc3_without_battery_leaves_the_window_open_bus() {
    let mut host = host();
    let mut board = create(image(4, 128 * 1024, 64 * 1024)).expect("create");
    board.reset(&mut host, true);
    board.cpu_write(&mut host, 0x6ABC, 0x42);
    assert_eq!(board.cpu_read(0x6ABC), 0x6A);
}

#[test]
fn fme7_counts_down_in_cpu_cycles_across_a_frame_boundary() {
    let mut host = host();
    let mut board = create(image(69, 128 * 1024, 64 * 1024)).expect("create");
    board.reset(&mut host, true);

    // Counter = 2000 CPU cycles, line enabled, counting.
    board.cpu_write(&mut host, 0x8000, 0xE);
    board.cpu_write(&mut host, 0xA000, 0xD0);
    board.cpu_write(&mut host, 0x8000, 0xF);
    board.cpu_write(&mut host, 0xA000, 0x07);
    board.cpu_write(&mut host, 0x8000, 0xD);
    board.cpu_write(&mut host, 0xA000, 0x81);

    // One update per frame misses nothing: the counter expires on the
    // 2001st CPU cycle regardless of call timing, and the per-frame rebase
    // keeps the count bounded while the host clock wraps.
    let frame = Mode::Ntsc.frame_cycles();
    let fire = 2001 * 12 + IRQ_DELAY;
    for _ in 0..2 {
        host.now = frame;
        board.update(&mut host);
        board.vsync(&mut host);
        host.now = 0;
    }
    assert_eq!(host.irqs, vec![fire]);
}

#[test]
fn soft_reset_preserves_play_state() {
    let mut host = host();
    let mut board = create(image(2, 128 * 1024, 0)).expect("create");
    board.reset(&mut host, true);
    // ROM drives 15 at 0xE000, so the AND passes 3 through; 16K bank 3
    // starts at the 8K-named byte 6.
    board.cpu_write(&mut host, 0xE000, 3);
    assert_eq!(board.cpu_read(0x8000), 6);

    board.reset(&mut host, false);
    assert_eq!(board.cpu_read(0x8000), 6);

    board.reset(&mut host, true);
    assert_eq!(board.cpu_read(0x8000), 0);
}
