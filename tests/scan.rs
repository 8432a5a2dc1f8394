#![cfg(feature = "rxing")]

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use zenscan::*;

const WAIT: Duration = Duration::from_secs(30);

#[derive(Clone, Default)]
struct Seen {
    found: Rc<RefCell<Vec<Barcode>>>,
    not_found: Rc<RefCell<usize>>,
    changed: Rc<RefCell<Vec<ReaderOption>>>,
}

impl ScanObserver for Seen {
    fn barcode_found(&mut self, barcode: &Barcode) {
        self.found.borrow_mut().push(barcode.clone());
    }

    fn barcode_not_found(&mut self) {
        *self.not_found.borrow_mut() += 1;
    }

    fn option_changed(&mut self, option: ReaderOption) {
        self.changed.borrow_mut().push(option);
    }
}

fn hello_qr() -> StillImage<'static> {
    write_barcode("HELLO123", BarcodeFormat::QrCode, 200, 200).unwrap()
}

fn assert_hello(barcode: &Barcode, width: u32, height: u32) {
    assert!(barcode.is_valid());
    assert_eq!(barcode.format(), BarcodeFormat::QrCode);
    assert_eq!(barcode.format_name(), "QRCode");
    assert_eq!(barcode.text(), "HELLO123");
    assert_eq!(barcode.bytes(), b"HELLO123");
    assert_eq!(barcode.content_type(), ContentType::Text);

    let (min, max) = barcode.position().bounds();
    let (cx, cy) = (width as i32 / 2, height as i32 / 2);
    assert!(min.x < cx && cx < max.x, "{}", barcode.position());
    assert!(min.y < cy && cy < max.y, "{}", barcode.position());
    for p in barcode.position().corners() {
        assert!(p.x >= 0 && p.x < width as i32, "{p}");
        assert!(p.y >= 0 && p.y < height as i32, "{p}");
    }
}

#[test]
fn generated_qr_is_found_through_dispatcher() {
    let image = hello_qr();
    let (w, h) = (image.width(), image.height());
    let seen = Seen::default();
    let mut dispatcher = Dispatcher::new(RxingDecoder::new(), seen.clone());

    assert_eq!(dispatcher.submit_image(image), Submission::Accepted);
    assert!(dispatcher.wait_for_event(WAIT));

    assert_eq!(*seen.not_found.borrow(), 0);
    let found = seen.found.borrow();
    assert_eq!(found.len(), 1);
    assert_hello(&found[0], w, h);
    assert!(dispatcher.last_run_time().is_some());
}

#[test]
fn blank_image_is_not_found_and_options_unchanged() {
    let seen = Seen::default();
    let mut dispatcher = Dispatcher::new(RxingDecoder::new(), seen.clone());
    let before = dispatcher.options().clone();

    let white = vec![255u8; 120 * 80];
    let image = StillImage::from_gray(&white, 120, 80).unwrap();
    assert_eq!(dispatcher.submit_image(image), Submission::Accepted);
    assert!(dispatcher.wait_for_event(WAIT));

    assert_eq!(*seen.not_found.borrow(), 1);
    assert!(seen.found.borrow().is_empty());
    assert!(seen.changed.borrow().is_empty());
    assert_eq!(dispatcher.options(), &before);
}

#[test]
fn read_barcode_on_still_image() {
    let image = hello_qr();
    let barcode = read_barcode(&RxingDecoder, &image, &ReaderOptions::default());
    assert_hello(&barcode, image.width(), image.height());
}

#[test]
fn format_filter_excludes_other_symbologies() {
    let image = hello_qr();
    let opts = ReaderOptions::default().with_formats(BarcodeFormats::EAN13);
    let barcode = read_barcode(&RxingDecoder, &image, &opts);
    assert!(!barcode.is_valid());
}

#[test]
fn hex_text_mode_renders_payload() {
    let image = hello_qr();
    let opts = ReaderOptions::default().with_text_mode(TextMode::Hex);
    let barcode = read_barcode(&RxingDecoder, &image, &opts);
    assert_eq!(barcode.text(), "48454C4C4F313233");
}

#[test]
fn eci_text_mode_carries_symbology_identifier() {
    let image = hello_qr();
    let opts = ReaderOptions::default().with_text_mode(TextMode::Eci);
    let barcode = read_barcode(&RxingDecoder, &image, &opts);
    assert!(barcode.text().starts_with("]Q"), "{}", barcode.text());
    assert!(barcode.text().ends_with("HELLO123"), "{}", barcode.text());
    assert_eq!(barcode.text().len(), "]Q1HELLO123".len());
    assert_eq!(barcode.bytes(), b"HELLO123");
    assert_eq!(barcode.content_type(), ContentType::Text);
}

#[test]
fn packed_32bit_frame_is_scanned_in_place() {
    let image = hello_qr();
    let (w, h) = (image.width(), image.height());
    let packed: Vec<u8> = image
        .pixels()
        .iter()
        .flat_map(|&v| [v, v, v, 255])
        .collect();
    let frame = CpuFrame::new(VideoPixelFormat::Argb32, w, h).with_plane(packed, w as usize * 4);

    let barcode = read_barcode_frame(&RxingDecoder, &frame, &ReaderOptions::default());
    assert_hello(&barcode, w, h);
}

#[test]
fn yuyv_frame_is_scanned_through_dispatcher() {
    let image = hello_qr();
    let (w, h) = (image.width(), image.height());
    let yuyv: Vec<u8> = image.pixels().iter().flat_map(|&y| [y, 128]).collect();
    let frame = CpuFrame::new(VideoPixelFormat::Yuyv, w, h).with_plane(yuyv, w as usize * 2);

    let seen = Seen::default();
    let mut dispatcher = Dispatcher::new(RxingDecoder::new(), seen.clone());
    assert_eq!(dispatcher.submit_frame(frame), Submission::Accepted);
    assert!(dispatcher.wait_for_event(WAIT));
    let found = seen.found.borrow();
    assert_eq!(found.len(), 1);
    assert_hello(&found[0], w, h);
}

#[test]
fn padded_qr_position_stays_on_symbol() {
    let image = hello_qr();
    let (w, h) = (image.width() as usize, image.height() as usize);
    // White margin on the right; the symbol stays at its original coordinates.
    let padded_w = w + 60;
    let mut padded = vec![255u8; padded_w * h];
    for y in 0..h {
        padded[y * padded_w..][..w].copy_from_slice(&image.pixels()[y * w..][..w]);
    }
    let img = StillImage::from_gray(&padded, padded_w as u32, h as u32).unwrap();
    let barcode = read_barcode(&RxingDecoder, &img, &ReaderOptions::default());
    assert!(barcode.is_valid());
    let (min, max) = barcode.position().bounds();
    assert!(max.x < w as i32, "{}", barcode.position());
    assert!(min.x >= 0 && min.y >= 0);
}

#[test]
fn vertical_linear_code_is_found_by_rotation_pass() {
    let code = write_barcode("ROT123", BarcodeFormat::Code128, 300, 100).unwrap();
    let (w, h) = (code.width() as usize, code.height() as usize);
    // Quarter turn counterclockwise: bars run horizontally, `h` wide and `w` tall.
    let mut vertical = vec![255u8; w * h];
    for y in 0..w {
        for x in 0..h {
            vertical[y * h + x] = code.pixels()[x * w + (w - 1 - y)];
        }
    }
    let image = StillImage::from_gray(&vertical, h as u32, w as u32).unwrap();
    // Without try-harder the linear reader only scans rows as given.
    let opts = ReaderOptions::default()
        .with_formats(BarcodeFormats::CODE128)
        .with_try_harder(false)
        .with_max_number_of_symbols(1);

    let unrotated = opts.clone().with_try_rotate(false);
    assert!(!read_barcode(&RxingDecoder, &image, &unrotated).is_valid());

    let barcode = read_barcode(&RxingDecoder, &image, &opts);
    assert!(barcode.is_valid());
    assert_eq!(barcode.format(), BarcodeFormat::Code128);
    assert_eq!(barcode.text(), "ROT123");

    let corners = barcode.position().corners();
    let x = corners[0].x;
    for p in corners {
        assert_eq!(p.x, x, "{}", barcode.position());
        assert!(p.x >= 0 && p.x < h as i32, "{p}");
        assert!(p.y >= 0 && p.y < w as i32, "{p}");
    }
    let (min, max) = barcode.position().bounds();
    assert!(max.y - min.y > w as i32 / 3, "{}", barcode.position());
}
