//! Entry catalog: the joined, validated table of channel entries.
//!
//! Two tables arrive from the loader. The *standard* table carries, per
//! (channel, sales house), a price and a rating for every audience segment the
//! sales house sells. The *affinity* table carries the planner's affinity score
//! for the same keys. [`Catalog::join`] checks both and pairs them up;
//! [`Catalog::resolve`] then picks one segment per sales house and produces the
//! flat [`ChannelEntry`] rows every later stage works on.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::DataError;

/// Price and rating of one channel for one audience segment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SegmentMetrics {
    /// Cost of one slot.
    pub price: f64,
    /// Rating points delivered by one slot (TRP).
    pub rating: f64,
}

/// One row of the standard (baseline) table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardRecord {
    pub channel_id: String,
    pub sales_house_id: String,
    /// Metrics keyed by audience segment name.
    pub segments: BTreeMap<String, SegmentMetrics>,
}

/// One row of the affinity table supplied by the planner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AffinityRecord {
    pub channel_id: String,
    pub sales_house_id: String,
    pub affinity: f64,
}

/// Audience segment chosen per sales house.
pub type SegmentSelection = BTreeMap<String, String>;

/// A standard row joined with its affinity score.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogRecord {
    pub channel_id: String,
    pub sales_house_id: String,
    pub segments: BTreeMap<String, SegmentMetrics>,
    pub affinity: f64,
}

/// A channel entry with its segment resolved. Input to every optimization stage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelEntry {
    pub channel_id: String,
    pub sales_house_id: String,
    /// Segment the price and rating were taken from.
    pub segment: String,
    pub price: f64,
    pub rating: f64,
    pub affinity: f64,
    /// `rating * price`; the spend of the standard split.
    pub baseline_spend: f64,
}

/// Joined catalog, in standard-table order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalog {
    records: Vec<CatalogRecord>,
}

impl Catalog {
    /// Join the standard and affinity tables on (channel, sales house).
    ///
    /// Every standard row needs exactly one affinity row and vice versa.
    pub fn join(
        standard: Vec<StandardRecord>,
        affinity: Vec<AffinityRecord>,
    ) -> Result<Self, DataError> {
        let mut affinity_by_key: HashMap<(String, String), f64> =
            HashMap::with_capacity(affinity.len());
        for row in affinity {
            check_value(&row.channel_id, "affinity", row.affinity)?;
            let key = (row.channel_id, row.sales_house_id);
            if affinity_by_key.insert(key.clone(), row.affinity).is_some() {
                return Err(DataError::DuplicateEntry {
                    table: "affinity",
                    channel: key.0,
                    sales_house: key.1,
                });
            }
        }

        let mut seen: HashSet<(String, String)> = HashSet::with_capacity(standard.len());
        let mut records = Vec::with_capacity(standard.len());
        for row in standard {
            let key = (row.channel_id.clone(), row.sales_house_id.clone());
            if !seen.insert(key.clone()) {
                return Err(DataError::DuplicateEntry {
                    table: "standard",
                    channel: key.0,
                    sales_house: key.1,
                });
            }
            for (segment, metrics) in &row.segments {
                check_value(&row.channel_id, &format!("price[{}]", segment), metrics.price)?;
                check_value(&row.channel_id, &format!("rating[{}]", segment), metrics.rating)?;
            }
            let affinity = affinity_by_key
                .remove(&key)
                .ok_or_else(|| DataError::MissingAffinity {
                    channel: key.0.clone(),
                    sales_house: key.1.clone(),
                })?;
            records.push(CatalogRecord {
                channel_id: row.channel_id,
                sales_house_id: row.sales_house_id,
                segments: row.segments,
                affinity,
            });
        }

        // Leftover affinity rows have no standard counterpart. Report the smallest key.
        if let Some((channel, sales_house)) = affinity_by_key.into_keys().min() {
            return Err(DataError::MissingStandard {
                channel,
                sales_house,
            });
        }

        Ok(Self { records })
    }

    pub fn records(&self) -> &[CatalogRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Sales houses in order of first appearance.
    pub fn sales_houses(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.records
            .iter()
            .map(|r| r.sales_house_id.as_str())
            .filter(|sh| seen.insert(*sh))
            .collect()
    }

    /// Resolve every record against the segment selection.
    ///
    /// The segment is looked up once per sales house, so every channel of a
    /// sales house is priced from the same segment.
    pub fn resolve(&self, selection: &SegmentSelection) -> Result<Vec<ChannelEntry>, DataError> {
        if self.records.is_empty() {
            return Err(DataError::EmptyCatalog);
        }
        self.records
            .iter()
            .map(|record| {
                let segment = selection.get(&record.sales_house_id).ok_or_else(|| {
                    DataError::MissingSegmentSelection {
                        sales_house: record.sales_house_id.clone(),
                    }
                })?;
                let (price, rating) = resolve_segment(record, segment)?;
                Ok(ChannelEntry {
                    channel_id: record.channel_id.clone(),
                    sales_house_id: record.sales_house_id.clone(),
                    segment: segment.clone(),
                    price,
                    rating,
                    affinity: record.affinity,
                    baseline_spend: rating * price,
                })
            })
            .collect()
    }
}

/// Pick the `(price, rating)` pair of `segment` for one record.
pub fn resolve_segment(
    record: &CatalogRecord,
    segment: &str,
) -> Result<(f64, f64), DataError> {
    record
        .segments
        .get(segment)
        .map(|m| (m.price, m.rating))
        .ok_or_else(|| DataError::UnknownSegment {
            channel: record.channel_id.clone(),
            sales_house: record.sales_house_id.clone(),
            segment: segment.to_string(),
        })
}

fn check_value(channel: &str, field: &str, value: f64) -> Result<(), DataError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(DataError::InvalidValue {
            channel: channel.to_string(),
            field: field.to_string(),
            value,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn standard(channel: &str, sh: &str, segments: &[(&str, f64, f64)]) -> StandardRecord {
        StandardRecord {
            channel_id: channel.to_string(),
            sales_house_id: sh.to_string(),
            segments: segments
                .iter()
                .map(|&(name, price, rating)| (name.to_string(), SegmentMetrics { price, rating }))
                .collect(),
        }
    }

    fn affinity(channel: &str, sh: &str, value: f64) -> AffinityRecord {
        AffinityRecord {
            channel_id: channel.to_string(),
            sales_house_id: sh.to_string(),
            affinity: value,
        }
    }

    fn two_house_catalog() -> Catalog {
        Catalog::join(
            vec![
                standard(
                    "ICTV",
                    "Sirius",
                    &[("All 18-60", 18000.0, 25.0), ("W 30+", 19500.0, 22.0)],
                ),
                standard(
                    "PLUSPLUS",
                    "Space",
                    &[("All 18-60", 6000.0, 7.0), ("W 30+", 6500.0, 6.5)],
                ),
                standard(
                    "STB",
                    "Sirius",
                    &[("All 18-60", 10000.0, 15.0), ("W 30+", 11000.0, 14.0)],
                ),
            ],
            vec![
                affinity("STB", "Sirius", 85.5),
                affinity("ICTV", "Sirius", 95.0),
                affinity("PLUSPLUS", "Space", 87.0),
            ],
        )
        .expect("join failed")
    }

    #[test]
    fn test_join_keeps_standard_order() {
        let catalog = two_house_catalog();
        let channels: Vec<_> = catalog.records().iter().map(|r| r.channel_id.as_str()).collect();
        assert_eq!(channels, vec!["ICTV", "PLUSPLUS", "STB"]);
        assert_eq!(catalog.records()[2].affinity, 85.5);
        assert_eq!(catalog.sales_houses(), vec!["Sirius", "Space"]);
    }

    #[test]
    fn test_join_missing_affinity() {
        let err = Catalog::join(
            vec![standard("ICTV", "Sirius", &[("All", 1.0, 1.0)])],
            vec![],
        )
        .unwrap_err();
        assert_eq!(
            err,
            DataError::MissingAffinity {
                channel: "ICTV".to_string(),
                sales_house: "Sirius".to_string(),
            }
        );
    }

    #[test]
    fn test_join_orphan_affinity() {
        let err = Catalog::join(
            vec![standard("ICTV", "Sirius", &[("All", 1.0, 1.0)])],
            vec![affinity("ICTV", "Sirius", 1.0), affinity("TET", "Sirius", 2.0)],
        )
        .unwrap_err();
        assert!(matches!(err, DataError::MissingStandard { ref channel, .. } if channel == "TET"));
    }

    #[test]
    fn test_join_rejects_duplicates_and_bad_numbers() {
        let dup = Catalog::join(
            vec![
                standard("ICTV", "Sirius", &[("All", 1.0, 1.0)]),
                standard("ICTV", "Sirius", &[("All", 2.0, 1.0)]),
            ],
            vec![affinity("ICTV", "Sirius", 1.0)],
        );
        assert!(matches!(dup, Err(DataError::DuplicateEntry { table: "standard", .. })));

        let negative = Catalog::join(
            vec![standard("ICTV", "Sirius", &[("All", -5.0, 1.0)])],
            vec![affinity("ICTV", "Sirius", 1.0)],
        );
        assert!(matches!(negative, Err(DataError::InvalidValue { .. })));

        let nan = Catalog::join(
            vec![standard("ICTV", "Sirius", &[("All", 5.0, 1.0)])],
            vec![affinity("ICTV", "Sirius", f64::NAN)],
        );
        assert!(matches!(nan, Err(DataError::InvalidValue { .. })));
    }

    #[test]
    fn test_resolve_uses_one_segment_per_sales_house() {
        let catalog = two_house_catalog();
        let selection: SegmentSelection = [
            ("Sirius".to_string(), "All 18-60".to_string()),
            ("Space".to_string(), "W 30+".to_string()),
        ]
        .into_iter()
        .collect();

        let entries = catalog.resolve(&selection).expect("resolve failed");
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].price, 18000.0);
        assert_eq!(entries[0].baseline_spend, 18000.0 * 25.0);
        assert_eq!(entries[1].segment, "W 30+");
        assert_eq!(entries[1].price, 6500.0);
        assert_eq!(entries[1].rating, 6.5);
        assert!(entries
            .iter()
            .filter(|e| e.sales_house_id == "Sirius")
            .all(|e| e.segment == "All 18-60"));
    }

    #[test]
    fn test_resolve_missing_selection() {
        let catalog = two_house_catalog();
        let selection: SegmentSelection =
            [("Sirius".to_string(), "All 18-60".to_string())].into_iter().collect();
        assert_eq!(
            catalog.resolve(&selection).unwrap_err(),
            DataError::MissingSegmentSelection {
                sales_house: "Space".to_string()
            }
        );
    }

    #[test]
    fn test_resolve_unknown_segment() {
        let catalog = two_house_catalog();
        let selection: SegmentSelection = [
            ("Sirius".to_string(), "M 18+".to_string()),
            ("Space".to_string(), "W 30+".to_string()),
        ]
        .into_iter()
        .collect();
        assert!(matches!(
            catalog.resolve(&selection),
            Err(DataError::UnknownSegment { ref segment, .. }) if segment == "M 18+"
        ));
    }

    #[test]
    fn test_resolve_empty_catalog() {
        let catalog = Catalog::default();
        assert_eq!(
            catalog.resolve(&SegmentSelection::new()).unwrap_err(),
            DataError::EmptyCatalog
        );
    }
}
