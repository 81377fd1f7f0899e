//! Initial particle layouts.

/// Lay out `count` particles on a square-ish lattice growing right and up
/// from `origin`, with `spacing` between rows and columns.
///
/// The lattice is `floor(sqrt(count))` columns wide; a non-square count
/// spills into extra rows on top.
pub fn lattice(count: usize, spacing: f32, origin: [f32; 2]) -> Vec<[f32; 2]> {
    let side = ((count as f32).sqrt() as usize).max(1);
    (0..count)
        .map(|i| {
            [
                origin[0] + spacing * (i % side) as f32,
                origin[1] + spacing * (i / side) as f32,
            ]
        })
        .collect()
}
