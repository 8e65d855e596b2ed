//! Compound identifier normalisation.
//!
//! Both descriptor and docking exports carry a `name` column that originates
//! from per-pose result files. The two tools decorate the ligand id
//! differently, so both sides are reduced to a canonical form before the
//! row-alignment check in the fusion stage.

/// Path prefix left over from the docking result directory.
const PATH_PREFIX: &str = "Resultados/";

/// Structure-file extension left over from per-pose filenames.
const FILE_SUFFIX: &str = ".pdb";

/// Normalise a compound identifier: strip the result-directory prefix and
/// the `.pdb` suffix, trim whitespace, uppercase.
///
/// Idempotent: normalising an already-normalised id is a no-op.
pub fn normalize_compound_id(raw: &str) -> String {
    let s = raw.strip_prefix(PATH_PREFIX).unwrap_or(raw);
    let s = s.strip_suffix(FILE_SUFFIX).unwrap_or(s);
    s.trim().to_uppercase()
}

/// Extract the ligand id from a docking-tool `Entry` value.
///
/// Entries look like `pose_0001|LIG123|rank1`; the ligand id is the second
/// pipe-separated segment. Entries without a pipe are taken as-is.
pub fn ligand_from_entry(entry: &str) -> &str {
    let mut parts = entry.split('|');
    let first = parts.next().unwrap_or(entry);
    parts.next().unwrap_or(first)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_prefix_and_suffix() {
        assert_eq!(normalize_compound_id("Resultados/lig42.pdb"), "LIG42");
        assert_eq!(normalize_compound_id("  lig42 "), "LIG42");
        assert_eq!(normalize_compound_id("CHEMBL1234"), "CHEMBL1234");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let once = normalize_compound_id("Resultados/zinc_000123.pdb");
        assert_eq!(normalize_compound_id(&once), once);
    }

    #[test]
    fn test_ligand_from_entry() {
        assert_eq!(ligand_from_entry("pose_0001|lig42|rank1"), "lig42");
        assert_eq!(ligand_from_entry("lig42"), "lig42");
    }
}
