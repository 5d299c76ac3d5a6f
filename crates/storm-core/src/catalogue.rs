//! Catalogue text I/O: `W H N` header line, then one `x y f v a` row per
//! localization, coordinates back in original-pixel units (divided by
//! `factor`).

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::Result;
use crate::localization::Catalogue;

/// Write `catalogue` as a plain-text layout: a `W H N` header, then
/// `x/factor y/factor frame value asymmetry` rows at the specified decimal
/// precision, for every localization in frame order.
pub fn write_catalogue(
    path: &Path,
    catalogue: &Catalogue,
    width: u32,
    height: u32,
    factor: u32,
) -> Result<()> {
    let file = File::create(path)?;
    let mut w = BufWriter::new(file);
    writeln!(w, "{} {} {}", width, height, catalogue.len())?;
    for (frame, set) in catalogue.iter() {
        for loc in set {
            writeln!(
                w,
                "{:.3} {:.3} {} {:.1} {:.3}",
                loc.x as f64 / factor as f64,
                loc.y as f64 / factor as f64,
                frame,
                loc.value,
                loc.asymmetry,
            )?;
        }
    }
    w.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::localization::{FrameLocalizationSet, Localization};

    #[test]
    fn writes_header_and_rows_in_frame_order() {
        let mut catalogue = Catalogue::with_capacity(2);
        let mut set0 = FrameLocalizationSet::new();
        set0.insert(Localization {
            x: 16,
            y: 24,
            value: 123.456,
            asymmetry: 0.875,
        });
        catalogue.set(0, set0);
        catalogue.set(1, FrameLocalizationSet::new());

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalogue.txt");
        write_catalogue(&path, &catalogue, 32, 32, 8).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next().unwrap(), "32 32 2");
        assert_eq!(lines.next().unwrap(), "2.000 3.000 0 123.5 0.875");
        assert!(lines.next().is_none());
    }
}
