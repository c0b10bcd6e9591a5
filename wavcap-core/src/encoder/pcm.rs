/// Pure sample math for the encode path: planar downmix and 16-bit
/// quantization. All operations work on plain buffers with no platform
/// dependencies.
///
/// Downmix planar channels to mono.
///
/// Mono input passes through. For multi-channel input the output is the
/// arithmetic mean of channels 0 and 1 per sample index; channels beyond
/// the first two are ignored (a documented limitation, not a defect).
/// If one plane is shorter, missing samples are treated as silence.
pub fn downmix_to_mono(channels: &[Vec<f32>]) -> Vec<f32> {
    match channels {
        [] => Vec::new(),
        [mono] => mono.clone(),
        [left, right, ..] => {
            let frames = left.len().max(right.len());
            let mut mono = Vec::with_capacity(frames);
            for i in 0..frames {
                let l = left.get(i).copied().unwrap_or(0.0);
                let r = right.get(i).copied().unwrap_or(0.0);
                mono.push((l + r) * 0.5);
            }
            mono
        }
    }
}

/// Quantize one float sample (nominal range [-1, 1]) to signed 16-bit.
///
/// Clamps first, then scales by 32768 for negatives and 32767 for
/// non-negatives. The asymmetric scale keeps exactly 1.0 at 32767 and
/// exactly -1.0 at -32768, with no wrap at either extreme.
pub fn quantize_sample(sample: f32) -> i16 {
    let clamped = sample.clamp(-1.0, 1.0);
    if clamped < 0.0 {
        (clamped * 32768.0).round() as i16
    } else {
        (clamped * 32767.0).round() as i16
    }
}

/// Quantize a mono float buffer to 16-bit samples.
pub fn quantize(samples: &[f32]) -> Vec<i16> {
    samples.iter().map(|&s| quantize_sample(s)).collect()
}
