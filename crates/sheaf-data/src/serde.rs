//! [serde] implementations for the containers.
//!
//! Sub-containers are written in a fixed order:
//! - `BatchContainer`: `shape`, then `batches` (one sequence per batch)
//! - `LabeledContainer`: `inputs`, then `labels`
//! - `WeightedContainer`: `data`, then `weights`
//!
//! Deserialising a labeled or weighted container checks that its parts share
//! one partitioning.

use ::serde::de::Error as _;
use ::serde::ser::{Error as _, SerializeSeq, SerializeStruct};
use ::serde::{Deserialize, Deserializer, Serialize, Serializer};

use sheaf_core::Shape;

use crate::batch::{BatchContainer, SharedBatch};
use crate::container::Container;
use crate::labeled::LabeledContainer;
use crate::weighted::WeightedContainer;

struct Batches<'a, T>(&'a [SharedBatch<T>]);

impl<T: Serialize> Serialize for Batches<'_, T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let Batches(batches) = self;
        let mut seq = serializer.serialize_seq(Some(batches.len()))?;
        for batch in batches.iter() {
            let elements = batch.read().map_err(S::Error::custom)?;
            seq.serialize_element(elements.as_slice())?;
        }
        seq.end()
    }
}

impl<T: Serialize> Serialize for BatchContainer<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut state = serializer.serialize_struct("BatchContainer", 2)?;
        state.serialize_field("shape", self.shape_ref())?;
        state.serialize_field("batches", &Batches(self.shared_batches()))?;
        state.end()
    }
}

#[derive(Deserialize)]
#[serde(rename = "BatchContainer")]
struct RawBatchContainer<T> {
    shape: Shape,
    batches: Vec<Vec<T>>,
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for BatchContainer<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = RawBatchContainer::<T>::deserialize(deserializer)?;
        Ok(BatchContainer::from_batches(raw.batches).with_shape(raw.shape))
    }
}

impl<I: Serialize, L: Serialize> Serialize for LabeledContainer<I, L> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut state = serializer.serialize_struct("LabeledContainer", 2)?;
        state.serialize_field("inputs", self.inputs())?;
        state.serialize_field("labels", self.labels())?;
        state.end()
    }
}

#[derive(Deserialize)]
#[serde(rename = "LabeledContainer")]
#[serde(bound(deserialize = "I: Deserialize<'de>, L: Deserialize<'de>"))]
struct RawLabeledContainer<I, L> {
    inputs: BatchContainer<I>,
    labels: BatchContainer<L>,
}

impl<'de, I, L> Deserialize<'de> for LabeledContainer<I, L>
where
    I: Clone + Deserialize<'de>,
    L: Clone + Deserialize<'de>,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = RawLabeledContainer::<I, L>::deserialize(deserializer)?;
        LabeledContainer::new(raw.inputs, raw.labels).map_err(D::Error::custom)
    }
}

impl<C: Container + Serialize> Serialize for WeightedContainer<C> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut state = serializer.serialize_struct("WeightedContainer", 2)?;
        state.serialize_field("data", self.data())?;
        state.serialize_field("weights", self.weights())?;
        state.end()
    }
}

#[derive(Deserialize)]
#[serde(rename = "WeightedContainer")]
#[serde(bound(deserialize = "C: Deserialize<'de>"))]
struct RawWeightedContainer<C> {
    data: C,
    weights: BatchContainer<f64>,
}

impl<'de, C> Deserialize<'de> for WeightedContainer<C>
where
    C: Container + Deserialize<'de>,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = RawWeightedContainer::<C>::deserialize(deserializer)?;
        WeightedContainer::new(raw.data, raw.weights).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::facades::{WeightedData, WeightedLabeledData};

    #[test]
    fn batch_container_layout() {
        let c = BatchContainer::from_batches(vec![vec![1, 2, 3], vec![4, 5]]).with_shape(());
        let actual = serde_json::to_string(&c).unwrap();
        assert_eq!(actual, r#"{"shape":[],"batches":[[1,2,3],[4,5]]}"#);

        let back: BatchContainer<i32> = serde_json::from_str(&actual).unwrap();
        assert_eq!(back.partitioning(), c.partitioning());
        assert_eq!(back.to_vec().unwrap(), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn weighted_field_order() {
        let w = WeightedData::from_ranges(vec![7u8, 8], vec![0.5, 1.0], 0).unwrap();
        let actual = serde_json::to_string(&w).unwrap();
        const EXPECTED: &str = "{\
\"data\":{\"shape\":[],\"batches\":[[7,8]]},\
\"weights\":{\"shape\":[],\"batches\":[[0.5,1.0]]}\
}";
        assert_eq!(actual, EXPECTED);
    }

    #[test]
    fn weighted_labeled_round_trip() {
        let w = WeightedLabeledData::from_ranges(
            vec![1.5, 2.5, 3.5],
            vec![0u32, 1, 0],
            vec![1.0, 2.0, 3.0],
            2,
        )
        .unwrap();
        let json = serde_json::to_string(&w).unwrap();
        let back: WeightedLabeledData<f64, u32> = serde_json::from_str(&json).unwrap();
        assert_eq!(back.partitioning().sizes(), &[2, 1]);
        assert_eq!(back.class_weight().unwrap(), vec![4.0, 2.0]);
    }

    #[test]
    fn mismatched_parts_are_rejected() {
        let json = r#"{
            "data": {"shape": [], "batches": [[1, 2], [3]]},
            "weights": {"shape": [], "batches": [[1.0], [1.0, 1.0]]}
        }"#;
        let err = serde_json::from_str::<WeightedData<i32>>(json).unwrap_err();
        assert!(err.to_string().contains("partitioning mismatch"));
    }
}
