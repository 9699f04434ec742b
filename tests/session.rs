use camrng::{
    hasher, CaptureError, CaptureSource, FrameBuffer, PixelFormat, Range, Session,
    SessionError, StubDevice,
};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

const TWELVE_BYTES_SHA256: &str =
    "fff3a9bcdd37363d703c1c4f9512533686157868f0d4f16a0f02d0f1da24f9a2";

fn session_with(device: impl FnOnce() -> StubDevice + Send + 'static) -> Session {
    let source = CaptureSource::new(Duration::from_millis(500));
    source.open_with(move || Ok(device())).unwrap();
    Session::with_source(source)
}

fn fixed_session() -> Session {
    session_with(|| {
        let bytes: Vec<u8> = (0x00..=0x0B).collect();
        StubDevice::fixed(FrameBuffer::new(3, 1, PixelFormat::Bgra, bytes).unwrap())
    })
}

#[test]
fn fixed_buffer_end_to_end() {
    let session = fixed_session();

    let (frame, digest) = session.capture().unwrap();
    assert_eq!(frame.bytes(), &(0x00..=0x0B).collect::<Vec<u8>>()[..]);
    assert_eq!(digest.to_hex(), TWELVE_BYTES_SHA256);

    let range = Range { min: 1, max: 1000 };
    assert_eq!(session.generate_number(range), Ok(681));
    assert_eq!(session.generate_number(range), Ok(681));

    session.stop();
}

#[test]
fn fixed_buffer_is_stable_across_sessions() {
    let range = Range { min: -100, max: 100 };
    let first = fixed_session().generate_number(range).unwrap();
    let second = fixed_session().generate_number(range).unwrap();
    assert_eq!(first, second);
}

#[test]
fn inverted_range_reported_as_input_error() {
    let session = fixed_session();
    let err = session.generate_number(Range { min: 5, max: 2 }).unwrap_err();
    assert_eq!(err, SessionError::InvalidRange { min: 5, max: 2 });
    assert!(session.last_capture().is_none());
}

#[test]
fn operations_after_stop_fail_cleanly() {
    let session = fixed_session();
    session.stop();
    session.stop();
    assert_eq!(
        session.generate_number(Range { min: 1, max: 10 }),
        Err(SessionError::CaptureFailed(CaptureError::Closed))
    );
}

/// Frame `n` is filled with byte `n`, so a torn frame shows up as mixed bytes.
fn uniform_frames(width: u32, height: u32) -> StubDevice {
    StubDevice::from_fn((width, height), move |n| {
        let len = width as usize * height as usize * 4;
        FrameBuffer::new(width, height, PixelFormat::Bgra, vec![n as u8; len]).ok()
    })
    .with_delay(Duration::from_millis(1))
}

fn assert_untorn(frame: &FrameBuffer, width: u32, height: u32) {
    let len = width as usize * height as usize * 4;
    assert_eq!(frame.bytes().len(), len);
    let first = frame.bytes()[0];
    assert_eq!(frame.checksum(), first as u64 * len as u64);
}

#[test]
fn preview_and_capture_do_not_tear_frames() {
    const W: u32 = 64;
    const H: u32 = 48;
    let session = Arc::new(session_with(|| uniform_frames(W, H)));

    let poller = {
        let session = session.clone();
        thread::spawn(move || {
            for _ in 0..200 {
                session.resume();
                if let Some(frame) = session.refresh_preview().unwrap() {
                    assert_untorn(&frame, W, H);
                }
                if let Some(frame) = session.current_preview() {
                    assert_untorn(&frame, W, H);
                }
            }
        })
    };

    let user = {
        let session = session.clone();
        thread::spawn(move || {
            for _ in 0..50 {
                let (frame, digest) = session.capture().unwrap();
                assert_untorn(&frame, W, H);
                assert_eq!(digest, hasher::hash(&frame).unwrap());

                let (last_frame, last_digest) = session.last_capture().unwrap();
                assert_untorn(&last_frame, W, H);
                assert_eq!(last_digest, hasher::hash(&last_frame).unwrap());

                let value = session.generate_number(Range { min: 1, max: 6 }).unwrap();
                assert!((1..=6).contains(&value));
            }
        })
    };

    poller.join().unwrap();
    user.join().unwrap();
    session.stop();
}
