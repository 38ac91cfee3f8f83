//! Save-state round-trips and forward compatibility.
//!
//! States are saved from a live MMC3 board (banking, work RAM, nametables,
//! and the scanline IRQ all in play), then loaded into a freshly built
//! board of the same type. Bit-identity of a second save is the yardstick:
//! if any bank index, RAM byte, or clock field drifted, the streams differ.

use nes_board::{Board, Chunk, ChunkWriter, Context, Error, Host, Mode, Tag, chunks, create};

struct ScriptHost {
    now: u64,
}

impl Host for ScriptHost {
    fn cycles(&self) -> u64 {
        self.now
    }
    fn mode(&self) -> Mode {
        Mode::Ntsc
    }
    fn irq(&mut self, _at_cycle: u64) {}
    fn clear_irq(&mut self) {}
    fn connect_a12(&mut self, _: bool) {}
    fn ppu_sync(&mut self) {}
}

fn host() -> ScriptHost {
    ScriptHost { now: 0 }
}

fn mmc3(host: &mut ScriptHost) -> Box<dyn Board> {
    let prg: Vec<u8> = (0..128 * 1024).map(|i| (i / 0x2000) as u8).collect();
    let chr: Vec<u8> = (0..64 * 1024).map(|i| (i / 0x400) as u8).collect();
    let mut ctx = Context::new(4, prg, chr);
    ctx.battery = true;
    let mut board = create(ctx).expect("create");
    board.reset(host, true);
    board
}

/// Drive the board into a state with nothing left at its power-on value.
fn scramble(board: &mut dyn Board, host: &mut ScriptHost) {
    board.cpu_write(host, 0x8000, 6);
    board.cpu_write(host, 0x8001, 9);
    board.cpu_write(host, 0x8000, 0x82); // CHR mode 1, select R2
    board.cpu_write(host, 0x8001, 47);
    board.cpu_write(host, 0xA000, 1); // horizontal mirroring
    board.cpu_write(host, 0x6000, 0xC3);
    board.cpu_write(host, 0x7FFF, 0x3C);
    board.ppu_write(0x2000, 0x55);
    board.cpu_write(host, 0xC000, 12); // IRQ latch
    board.cpu_write(host, 0xC001, 0);
    board.cpu_write(host, 0xE001, 0); // IRQ enable
    host.now = 10_000;
    board.a12(host, 10_000);
}

fn save(board: &dyn Board) -> Vec<u8> {
    let mut w = ChunkWriter::new();
    board.save(&mut w);
    w.finish()
}

#[test]
fn round_trip_is_bit_identical() {
    let mut host = host();
    let mut board = mmc3(&mut host);
    scramble(board.as_mut(), &mut host);
    let first = save(board.as_ref());

    let mut fresh = mmc3(&mut host);
    fresh.load(&mut host, &first).expect("load");
    assert_eq!(save(fresh.as_ref()), first);
}

#[test]
fn loaded_board_behaves_like_the_original() {
    let mut host = host();
    let mut board = mmc3(&mut host);
    scramble(board.as_mut(), &mut host);
    let stream = save(board.as_ref());

    let mut fresh = mmc3(&mut host);
    fresh.load(&mut host, &stream).expect("load");
    assert_eq!(fresh.cpu_read(0x8000), 9);
    assert_eq!(fresh.cpu_read(0x6000), 0xC3);
    assert_eq!(fresh.cpu_read(0x7FFF), 0x3C);
    assert_eq!(fresh.ppu_read(0x0000), 47);
    // Horizontal mirroring: 0x2400 shares with 0x2000.
    assert_eq!(fresh.ppu_read(0x2400), 0x55);
}

#[test]
fn unknown_root_chunk_is_skipped() {
    let mut host = host();
    let mut board = mmc3(&mut host);
    scramble(board.as_mut(), &mut host);
    let clean = save(board.as_ref());

    // Splice a synthetic chunk between the real ones.
    let mut w = ChunkWriter::new();
    let parsed: Vec<Chunk<'_>> = chunks(&clean).expect("parse");
    for (i, chunk) in parsed.iter().enumerate() {
        if i == 1 {
            w.begin(Tag::new(*b"Zzz\0"));
            w.u64(0xDEAD_BEEF_DEAD_BEEF);
            w.end();
        }
        w.begin(chunk.tag);
        w.bytes(chunk.payload);
        w.end();
    }
    let spliced = w.finish();

    let mut fresh = mmc3(&mut host);
    fresh.load(&mut host, &spliced).expect("load");
    assert_eq!(save(fresh.as_ref()), clean);
}

#[test]
fn unknown_nested_chunk_is_skipped() {
    let mut host = host();
    let mut board = mmc3(&mut host);
    scramble(board.as_mut(), &mut host);
    let clean = save(board.as_ref());
    let own = board.tag();

    // Append a synthetic chunk inside the board's own chunk.
    let mut w = ChunkWriter::new();
    for chunk in chunks(&clean).expect("parse") {
        w.begin(chunk.tag);
        w.bytes(chunk.payload);
        if chunk.tag == own {
            w.begin(Tag::new(*b"Xtr\0"));
            w.u32(7);
            w.end();
        }
        w.end();
    }
    let spliced = w.finish();

    let mut fresh = mmc3(&mut host);
    fresh.load(&mut host, &spliced).expect("load");
    assert_eq!(save(fresh.as_ref()), clean);
}

#[test]
fn foreign_board_chunk_is_tolerated() {
    let mut host = host();
    let mut board = mmc3(&mut host);
    scramble(board.as_mut(), &mut host);
    let clean = save(board.as_ref());
    let own = board.tag();

    // Retag the board chunk as if it came from another mapper's state.
    let mut w = ChunkWriter::new();
    for chunk in chunks(&clean).expect("parse") {
        let tag = if chunk.tag == own {
            Tag::numeric(99)
        } else {
            chunk.tag
        };
        w.begin(tag);
        w.bytes(chunk.payload);
        w.end();
    }
    let foreign = w.finish();

    // The load succeeds; the common regions still land.
    let mut fresh = mmc3(&mut host);
    fresh.load(&mut host, &foreign).expect("load");
    assert_eq!(fresh.cpu_read(0x6000), 0xC3);
}

#[test]
fn truncated_stream_leaves_live_state_untouched() {
    let mut host = host();
    let mut board = mmc3(&mut host);
    scramble(board.as_mut(), &mut host);
    let stream = save(board.as_ref());

    let mut fresh = mmc3(&mut host);
    let before = save(fresh.as_ref());
    let result = fresh.load(&mut host, &stream[..stream.len() - 3]);
    assert!(matches!(result, Err(Error::Truncated(_))));
    assert_eq!(save(fresh.as_ref()), before);
}
