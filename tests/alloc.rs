use gifmux::{ColorMap, Config, Muxer, PixelFormat};
use std::alloc::{GlobalAlloc, Layout, System};
use std::cell::Cell;

/// Allocator which counts live bytes per thread
struct Counting;

thread_local! {
    static LIVE: Cell<isize> = const { Cell::new(0) };
}

fn adjust(delta: isize) {
    let _ = LIVE.try_with(|live| live.set(live.get() + delta));
}

fn live_bytes() -> isize {
    LIVE.with(|live| live.get())
}

unsafe impl GlobalAlloc for Counting {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        let ptr = System.alloc(layout);
        if !ptr.is_null() {
            adjust(layout.size() as isize);
        }
        ptr
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        System.dealloc(ptr, layout);
        adjust(-(layout.size() as isize));
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize)
        -> *mut u8
    {
        let p = System.realloc(ptr, layout, new_size);
        if !p.is_null() {
            adjust(new_size as isize - layout.size() as isize);
        }
        p
    }
}

#[global_allocator]
static GLOBAL: Counting = Counting;

/// Run one open / push / close cycle into a sink
fn cycle(color_map: ColorMap, n_frames: usize) -> isize {
    let config = Config::new(24, 16)
        .with_color_map(color_map)
        .with_prealloc_hint(24 * 16 * 3);
    let mut mux = Muxer::new();
    mux.open_writer(std::io::sink(), &config).unwrap();
    let mut peak = 0;
    for i in 0..n_frames {
        let v = (i * 37 % 256) as u8;
        let pixels = [v, 255 - v, 128, 255].repeat(24 * 16);
        mux.push(PixelFormat::Rgba32, &pixels, 24, 16, 4).unwrap();
        peak = peak.max(live_bytes());
    }
    mux.close().unwrap();
    peak
}

#[test]
fn memory_released_at_close() {
    let baseline = live_bytes();
    for n in [1, 4, 0, 7, 2].iter().copied() {
        let peak = cycle(ColorMap::Global, n);
        assert_eq!(live_bytes(), baseline);
        if n > 0 {
            // global frames stay buffered until close
            assert!(peak - baseline >= (n * 24 * 16 * 3) as isize);
        }
        cycle(ColorMap::Local, n);
        assert_eq!(live_bytes(), baseline);
    }
}
