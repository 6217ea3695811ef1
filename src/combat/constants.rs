//! Combat rule constants - all fixed rule numbers in one place

// Dice
pub const DIE_FACES: u8 = 6;
pub const BASE_HIT_THRESHOLD: u8 = 6;
pub const MAGIC_HIT_THRESHOLD: u8 = 5;
/// Threshold for an already magic-scoring unit wielding a magic sword
pub const EMPOWERED_HIT_THRESHOLD: u8 = 4;
pub const FORT_HIT_THRESHOLD: u8 = 6;

// Modifiers (dice, additive)
pub const NATIVE_TERRAIN_BONUS: u32 = 1;
pub const LEADER_BONUS: u32 = 1;
pub const OUTNUMBERED_INITIATIVE_BONUS: u8 = 1;

// Fortifications
pub const MAX_FORTIFICATION_LEVEL: u8 = 4;
/// Auto-hits when both siege specialists attack together
pub const SIEGE_PAIR_AUTO_HITS: u32 = 2;
pub const SIEGE_SINGLE_AUTO_HITS: u32 = 1;

// Casualties
pub const DEFAULT_HIT_POINTS: u32 = 1;
/// Hits a flyer can absorb in one batch (one saving roll, two is certain death)
pub const FLYER_HIT_CAPACITY: u32 = 2;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thresholds_ordered() {
        assert!(EMPOWERED_HIT_THRESHOLD < MAGIC_HIT_THRESHOLD);
        assert!(MAGIC_HIT_THRESHOLD < BASE_HIT_THRESHOLD);
        assert!(BASE_HIT_THRESHOLD <= DIE_FACES);
    }

    #[test]
    fn test_siege_hits_reasonable() {
        assert!(SIEGE_SINGLE_AUTO_HITS < SIEGE_PAIR_AUTO_HITS);
        assert!(SIEGE_PAIR_AUTO_HITS <= MAX_FORTIFICATION_LEVEL as u32);
    }
}
