use crate::error::{ProtocolError, Result};
use crate::protocol::chunk::{ChunkColumn, ChunkSection, SECTION_VOLUME};

/// Bytes per packed nibble plane (4 bits per block).
const NIBBLE_PLANE_BYTES: usize = SECTION_VOLUME / 2;
/// Bytes in the per-column biome id array.
const BIOME_BYTES: usize = 256;

/// A chunk column exactly as it crosses the wire: presence masks, feature
/// flags and the packed plane buffer. Both flags are per-value state; ground
/// continuity (`has_biomes`) marks a full-column transfer where unmasked
/// sections are removed rather than left unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkChunkData {
    pub x: i32,
    pub z: i32,
    /// Bit i set = section slot i present in `data`.
    pub primary_mask: u16,
    /// Bit i set = slot i carries (or reserves) an extended block plane.
    pub extended_mask: u16,
    pub has_sky_light: bool,
    pub has_biomes: bool,
    pub data: Vec<u8>,
}

/// Slices `len` bytes at `pos`, returning the slice and the advanced
/// cursor, or a truncation error when the buffer is too short.
fn take(data: &[u8], pos: usize, len: usize) -> Result<(&[u8], usize)> {
    if data.len() < pos + len {
        return Err(ProtocolError::Truncated {
            needed: len,
            remaining: data.len().saturating_sub(pos),
        });
    }
    Ok((&data[pos..pos + len], pos + len))
}

/// Reconstructs a chunk column from its wire form. The buffer is consumed
/// in five ordered passes over the 16 slot indices (block ids, metadata,
/// block light, sky light, extended block data), then the biome array.
/// Extra trailing bytes are ignored; missing bytes are an error.
pub fn data_to_chunks(data: &NetworkChunkData) -> Result<ChunkColumn> {
    let mut sections: [Option<ChunkSection>; 16] = Default::default();
    let mut pos = 0;

    // Pass 1: allocate masked sections and copy their block ids.
    for ind in 0..16 {
        if data.primary_mask & (1 << ind) != 0 {
            let mut section = ChunkSection::new(
                data.has_sky_light,
                data.extended_mask & (1 << ind) != 0,
            );
            let (bytes, next) = take(&data.data, pos, SECTION_VOLUME)?;
            section.blocks_mut().copy_from_slice(bytes);
            pos = next;
            sections[ind] = Some(section);
        } else if data.has_biomes {
            // Full-column transfer: a slot absent from the mask is removed,
            // not merely left out of this update.
            sections[ind] = None;
        }
    }

    // Pass 2: metadata nibbles.
    for ind in 0..16 {
        if data.primary_mask & (1 << ind) == 0 {
            continue;
        }
        let (bytes, next) = take(&data.data, pos, NIBBLE_PLANE_BYTES)?;
        if let Some(section) = sections[ind].as_mut() {
            section.metadata_mut().data_mut().copy_from_slice(bytes);
        }
        pos = next;
    }

    // Pass 3: block light nibbles.
    for ind in 0..16 {
        if data.primary_mask & (1 << ind) == 0 {
            continue;
        }
        let (bytes, next) = take(&data.data, pos, NIBBLE_PLANE_BYTES)?;
        if let Some(section) = sections[ind].as_mut() {
            section.block_light_mut().data_mut().copy_from_slice(bytes);
        }
        pos = next;
    }

    // Pass 4: sky light nibbles, present only when the column carries them.
    if data.has_sky_light {
        for ind in 0..16 {
            if data.primary_mask & (1 << ind) == 0 {
                continue;
            }
            let (bytes, next) = take(&data.data, pos, NIBBLE_PLANE_BYTES)?;
            if let Some(sky_light) = sections[ind].as_mut().and_then(ChunkSection::sky_light_mut) {
                sky_light.data_mut().copy_from_slice(bytes);
            }
            pos = next;
        }
    }

    // Pass 5: extended block data. The extended mask reserves space even
    // over absent sections, so the cursor advances either way.
    for ind in 0..16 {
        if data.extended_mask & (1 << ind) != 0 {
            let (bytes, next) = take(&data.data, pos, NIBBLE_PLANE_BYTES)?;
            if let Some(extended) = sections[ind]
                .as_mut()
                .and_then(ChunkSection::extended_blocks_mut)
            {
                extended.data_mut().copy_from_slice(bytes);
            }
            pos = next;
        } else if data.has_biomes {
            if let Some(section) = sections[ind].as_mut() {
                section.delete_extended_blocks();
            }
        }
    }

    let biomes = if data.has_biomes {
        let (bytes, _) = take(&data.data, pos, BIOME_BYTES)?;
        Some(bytes.to_vec())
    } else {
        None
    };

    Ok(ChunkColumn {
        x: data.x,
        z: data.z,
        sections,
        biomes,
    })
}

/// Serializes a chunk column to its wire form. A slot participates when it
/// holds a section and, on full-column transfers, that section is not empty
/// under the caller's `is_empty` predicate (`ChunkSection::is_empty` is the
/// stock choice). The first pass computes masks and the exact payload
/// length; the buffer is then filled in the same five-pass order the
/// decoder consumes, slots ascending, followed by the biome array.
pub fn chunks_to_data<F>(column: &ChunkColumn, is_empty: F) -> Result<NetworkChunkData>
where
    F: Fn(&ChunkSection) -> bool,
{
    let has_biomes = column.biomes.is_some();
    let mut primary_mask: u16 = 0;
    let mut extended_mask: u16 = 0;
    let mut has_sky_light = false;
    let mut length = column.biomes.as_ref().map_or(0, Vec::len);

    // Pass 0: masks and exact byte length.
    for (ind, slot) in column.sections.iter().enumerate() {
        let section = match slot {
            Some(section) if !(has_biomes && is_empty(section)) => section,
            _ => continue,
        };
        primary_mask |= 1 << ind;
        length += SECTION_VOLUME + 2 * NIBBLE_PLANE_BYTES;
        if section.sky_light().is_some() {
            has_sky_light = true;
            length += NIBBLE_PLANE_BYTES;
        }
        if section.extended_blocks().is_some() {
            extended_mask |= 1 << ind;
            length += NIBBLE_PLANE_BYTES;
        }
    }

    let participating = || {
        column
            .sections
            .iter()
            .flatten()
            .filter(|&section| !(has_biomes && is_empty(section)))
    };

    let mut data = Vec::with_capacity(length);
    for section in participating() {
        data.extend_from_slice(section.blocks());
    }
    for section in participating() {
        data.extend_from_slice(section.metadata().data());
    }
    for section in participating() {
        data.extend_from_slice(section.block_light().data());
    }
    for section in participating() {
        if let Some(sky_light) = section.sky_light() {
            data.extend_from_slice(sky_light.data());
        }
    }
    for section in participating() {
        if let Some(extended) = section.extended_blocks() {
            data.extend_from_slice(extended.data());
        }
    }
    if let Some(biomes) = &column.biomes {
        data.extend_from_slice(biomes);
    }
    debug_assert_eq!(data.len(), length);

    Ok(NetworkChunkData {
        x: column.x,
        z: column.z,
        primary_mask,
        extended_mask,
        has_sky_light,
        has_biomes,
        data,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn patterned_section(seed: u8, sky: bool, extended: bool) -> ChunkSection {
        let mut section = ChunkSection::new(sky, extended);
        for (i, block) in section.blocks_mut().iter_mut().enumerate() {
            *block = seed.wrapping_add(i as u8);
        }
        for (i, byte) in section.metadata_mut().data_mut().iter_mut().enumerate() {
            *byte = seed.wrapping_mul(3).wrapping_add(i as u8);
        }
        for (i, byte) in section.block_light_mut().data_mut().iter_mut().enumerate() {
            *byte = seed.wrapping_mul(5).wrapping_add(i as u8);
        }
        if let Some(sky_light) = section.sky_light_mut() {
            for (i, byte) in sky_light.data_mut().iter_mut().enumerate() {
                *byte = seed.wrapping_mul(7).wrapping_add(i as u8);
            }
        }
        if let Some(ext) = section.extended_blocks_mut() {
            for (i, byte) in ext.data_mut().iter_mut().enumerate() {
                *byte = seed.wrapping_mul(11).wrapping_add(i as u8);
            }
        }
        section
    }

    #[test]
    fn test_single_section_scenario() {
        // Slot 0 only, no sky light, no extended data, no biomes.
        let mut column = ChunkColumn::new(5, -3);
        let mut section = ChunkSection::new(false, false);
        section.blocks_mut().fill(7);
        column.sections[0] = Some(section);

        let data = chunks_to_data(&column, ChunkSection::is_empty).unwrap();
        assert_eq!(data.primary_mask, 0x0001);
        assert_eq!(data.extended_mask, 0);
        assert!(!data.has_sky_light);
        assert!(!data.has_biomes);
        assert_eq!(data.data.len(), 4096 + 2048 + 2048);

        let decoded = data_to_chunks(&data).unwrap();
        assert_eq!(decoded.x, 5);
        assert_eq!(decoded.z, -3);
        let section = decoded.sections[0].as_ref().unwrap();
        assert!(section.blocks().iter().all(|&block| block == 7));
        assert!(decoded.sections[1..].iter().all(Option::is_none));
        assert_eq!(decoded, column);
    }

    #[test]
    fn test_full_feature_roundtrip() {
        let mut column = ChunkColumn::new(-12, 40);
        column.sections[0] = Some(patterned_section(1, true, false));
        column.sections[3] = Some(patterned_section(9, true, true));
        column.sections[15] = Some(patterned_section(200, true, false));
        column.biomes = Some((0..=255).collect());

        let data = chunks_to_data(&column, ChunkSection::is_empty).unwrap();
        assert_eq!(data.primary_mask, (1 << 0) | (1 << 3) | (1 << 15));
        assert_eq!(data.extended_mask, 1 << 3);
        assert!(data.has_sky_light);
        assert!(data.has_biomes);

        let decoded = data_to_chunks(&data).unwrap();
        assert_eq!(decoded, column);
    }

    #[test]
    fn test_exact_sizing_and_reencode() {
        let mut column = ChunkColumn::new(0, 0);
        column.sections[2] = Some(patterned_section(4, true, true));
        column.sections[7] = Some(patterned_section(8, true, false));
        column.biomes = Some(vec![42; 256]);

        let data = chunks_to_data(&column, ChunkSection::is_empty).unwrap();
        // Two sections of blocks + metadata + block light + sky light, one
        // extended plane, one biome array.
        let expected = 2 * (4096 + 2048 + 2048 + 2048) + 2048 + 256;
        assert_eq!(data.data.len(), expected);

        let reencoded =
            chunks_to_data(&data_to_chunks(&data).unwrap(), ChunkSection::is_empty).unwrap();
        assert_eq!(reencoded, data);
    }

    #[test]
    fn test_biome_mode_drops_empty_sections() {
        let mut column = ChunkColumn::new(1, 1);
        column.sections[4] = Some(patterned_section(3, false, false));
        column.sections[9] = Some(ChunkSection::new(false, false));
        column.biomes = Some(vec![0; 256]);

        let data = chunks_to_data(&column, ChunkSection::is_empty).unwrap();
        assert_eq!(data.primary_mask, 1 << 4);
        assert_eq!(data.data.len(), 4096 + 2048 + 2048 + 256);

        let decoded = data_to_chunks(&data).unwrap();
        assert!(decoded.sections[9].is_none());
        assert_eq!(decoded.sections[4], column.sections[4]);
    }

    #[test]
    fn test_empty_sections_kept_without_biomes() {
        let mut column = ChunkColumn::new(1, 1);
        column.sections[9] = Some(ChunkSection::new(false, false));

        let data = chunks_to_data(&column, ChunkSection::is_empty).unwrap();
        assert_eq!(data.primary_mask, 1 << 9);

        let decoded = data_to_chunks(&data).unwrap();
        assert!(decoded.sections[9].is_some());
        assert_eq!(decoded, column);
    }

    #[test]
    fn test_reserved_extended_space_is_skipped() {
        // Extended bit set over an absent section: 2048 bytes are consumed
        // and discarded, keeping the biome array aligned.
        let mut payload = vec![0xAA; 2048];
        payload.extend_from_slice(&[9; 256]);
        let data = NetworkChunkData {
            x: 0,
            z: 0,
            primary_mask: 0,
            extended_mask: 1 << 2,
            has_sky_light: false,
            has_biomes: true,
            data: payload,
        };

        let decoded = data_to_chunks(&data).unwrap();
        assert!(decoded.sections.iter().all(Option::is_none));
        assert_eq!(decoded.biomes.as_deref(), Some(&[9u8; 256][..]));
    }

    #[test]
    fn test_truncated_buffer_fails() {
        let data = NetworkChunkData {
            x: 0,
            z: 0,
            primary_mask: 0x0001,
            extended_mask: 0,
            has_sky_light: false,
            has_biomes: false,
            data: vec![7; 100],
        };
        assert_matches!(
            data_to_chunks(&data),
            Err(ProtocolError::Truncated { .. })
        );

        // Blocks fit but the nibble planes are missing.
        let data = NetworkChunkData {
            data: vec![7; 4096],
            ..data
        };
        assert_matches!(
            data_to_chunks(&data),
            Err(ProtocolError::Truncated {
                needed: 2048,
                remaining: 0
            })
        );
    }

    #[test]
    fn test_surplus_bytes_are_tolerated() {
        let mut column = ChunkColumn::new(0, 0);
        column.sections[0] = Some(patterned_section(1, false, false));
        let mut data = chunks_to_data(&column, ChunkSection::is_empty).unwrap();
        data.data.extend_from_slice(&[0xFF; 64]);

        let decoded = data_to_chunks(&data).unwrap();
        assert_eq!(decoded, column);
    }

    #[test]
    fn test_sky_light_flag_tracks_planes() {
        let mut column = ChunkColumn::new(0, 0);
        column.sections[1] = Some(patterned_section(2, false, false));
        let data = chunks_to_data(&column, ChunkSection::is_empty).unwrap();
        assert!(!data.has_sky_light);
        assert_eq!(data.data.len(), 4096 + 2048 + 2048);
    }

    #[test]
    fn test_injected_emptiness_predicate() {
        // A predicate that treats everything as empty drops all sections
        // under biome mode.
        let mut column = ChunkColumn::new(0, 0);
        column.sections[5] = Some(patterned_section(6, false, false));
        column.biomes = Some(vec![1; 256]);

        let data = chunks_to_data(&column, |_| true).unwrap();
        assert_eq!(data.primary_mask, 0);
        assert_eq!(data.data.len(), 256);
    }
}
