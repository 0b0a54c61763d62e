//! Tests for AudioBuffer.

use super::*;

#[test]
fn test_from_interleaved_rejects_ragged_input() {
    assert!(AudioBuffer::from_interleaved(vec![0.0; 5], 2, 44100).is_err());
    assert!(AudioBuffer::from_interleaved(vec![0.0; 4], 0, 44100).is_err());
}

#[test]
fn test_frames_and_channels() {
    let buffer =
        AudioBuffer::from_interleaved(vec![1.0, -1.0, 2.0, -2.0, 3.0, -3.0], 2, 48000).unwrap();
    assert_eq!(buffer.num_frames(), 3);
    assert_eq!(buffer.channels(), 2);
    assert_eq!(buffer.frame(1), Some(&[2.0, -2.0][..]));
    assert_eq!(buffer.frame(3), None);
    assert_eq!(buffer.channel(0), vec![1.0, 2.0, 3.0]);
    assert_eq!(buffer.channel(1), vec![-1.0, -2.0, -3.0]);
    assert_eq!(buffer.peak(), 3.0);
    assert_eq!(buffer.to_mono(), vec![0.0, 0.0, 0.0]);
}

#[test]
fn test_silent_buffer() {
    let buffer = AudioBuffer::silent(100, 2, 22050);
    assert_eq!(buffer.num_frames(), 100);
    assert_eq!(buffer.energy(), 0.0);
    assert!((buffer.duration_seconds() - 100.0 / 22050.0).abs() < 1e-12);
}

#[test]
fn test_empty_buffer() {
    let buffer = AudioBuffer::empty(2, 44100);
    assert!(buffer.is_empty());
    assert_eq!(buffer.num_frames(), 0);
    assert_eq!(buffer.peak(), 0.0);
}
