//! Native-to-columnar type mapping.
//!
//! The first dimension of a dataset is the row dimension and never appears in
//! the column type; each trailing dimension becomes one `FixedSizeList`
//! nesting layer. Opaque (string-tagged) elements always map to `Utf8`.
//! Nothing here is nullable: the store has no notion of missing values, so
//! every inferred column is a non-nullable bottom type.

use std::sync::Arc;

use arrow::array::{
    Array, ArrayRef, BooleanArray, FixedSizeListArray, Float32Array, Float64Array, Int16Array,
    Int32Array, Int64Array, Int8Array, StringArray, UInt16Array, UInt32Array, UInt64Array,
    UInt8Array,
};
use arrow::datatypes::{DataType, Field};

use gedi_hdf5::{ElementKind, SliceData};

use crate::error::{Result, ScanError};

/// Arrow scalar type for a native element kind.
pub fn scalar_type(kind: ElementKind) -> DataType {
    match kind {
        ElementKind::Bool => DataType::Boolean,
        ElementKind::Int8 => DataType::Int8,
        ElementKind::Int16 => DataType::Int16,
        ElementKind::Int32 => DataType::Int32,
        ElementKind::Int64 => DataType::Int64,
        ElementKind::Uint8 => DataType::UInt8,
        ElementKind::Uint16 => DataType::UInt16,
        ElementKind::Uint32 => DataType::UInt32,
        ElementKind::Uint64 => DataType::UInt64,
        ElementKind::Float32 => DataType::Float32,
        ElementKind::Float64 => DataType::Float64,
        ElementKind::Opaque => DataType::Utf8,
    }
}

fn list_item(item: DataType) -> Arc<Field> {
    Arc::new(Field::new("item", item, true))
}

/// Column type for a dataset of the given element kind and shape: the scalar
/// type wrapped in one `FixedSizeList` layer per trailing dimension.
pub fn column_type(kind: ElementKind, shape: &[usize]) -> DataType {
    let mut dtype = scalar_type(kind);
    for &extent in shape.iter().skip(1) {
        dtype = DataType::FixedSizeList(list_item(dtype), extent as i32);
    }
    dtype
}

/// Materialize a flat row-major slice buffer into an Arrow array of the
/// mapped column type.
pub fn build_array(shape: &[usize], data: SliceData) -> Result<ArrayRef> {
    let mut array: ArrayRef = match data {
        SliceData::Bool(v) => Arc::new(BooleanArray::from(v)),
        SliceData::Int8(v) => Arc::new(Int8Array::from(v)),
        SliceData::Int16(v) => Arc::new(Int16Array::from(v)),
        SliceData::Int32(v) => Arc::new(Int32Array::from(v)),
        SliceData::Int64(v) => Arc::new(Int64Array::from(v)),
        SliceData::Uint8(v) => Arc::new(UInt8Array::from(v)),
        SliceData::Uint16(v) => Arc::new(UInt16Array::from(v)),
        SliceData::Uint32(v) => Arc::new(UInt32Array::from(v)),
        SliceData::Uint64(v) => Arc::new(UInt64Array::from(v)),
        SliceData::Float32(v) => Arc::new(Float32Array::from(v)),
        SliceData::Float64(v) => Arc::new(Float64Array::from(v)),
        SliceData::Str(v) => Arc::new(StringArray::from(v)),
    };

    for &extent in shape.iter().skip(1) {
        if extent == 0 || array.len() % extent != 0 {
            return Err(ScanError::shape(format!(
                "cannot group {} elements into lists of {}",
                array.len(),
                extent
            )));
        }
        let field = list_item(array.data_type().clone());
        array = Arc::new(FixedSizeListArray::new(field, extent as i32, array, None));
    }
    Ok(array)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::Array;

    #[test]
    fn test_scalar_types() {
        assert_eq!(scalar_type(ElementKind::Float64), DataType::Float64);
        assert_eq!(scalar_type(ElementKind::Uint8), DataType::UInt8);
        assert_eq!(scalar_type(ElementKind::Bool), DataType::Boolean);
        // Opaque data is string data, never numeric.
        assert_eq!(scalar_type(ElementKind::Opaque), DataType::Utf8);
    }

    #[test]
    fn test_column_type_1d_is_scalar() {
        assert_eq!(
            column_type(ElementKind::Float64, &[10_000]),
            DataType::Float64
        );
    }

    #[test]
    fn test_column_type_2d_nests_one_list() {
        let dt = column_type(ElementKind::Float64, &[10_000, 10]);
        assert_eq!(
            dt,
            DataType::FixedSizeList(list_item(DataType::Float64), 10)
        );
    }

    #[test]
    fn test_column_type_3d_nests_two_lists() {
        let dt = column_type(ElementKind::Uint8, &[10_000, 10, 3]);
        let inner = DataType::FixedSizeList(list_item(DataType::UInt8), 10);
        assert_eq!(dt, DataType::FixedSizeList(list_item(inner), 3));
    }

    #[test]
    fn test_build_array_1d() {
        let array = build_array(&[3], SliceData::Int64(vec![1, 2, 3])).unwrap();
        assert_eq!(array.len(), 3);
        assert_eq!(array.data_type(), &DataType::Int64);
    }

    #[test]
    fn test_build_array_2d_groups_rows() {
        let array =
            build_array(&[2, 3], SliceData::Float32(vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0])).unwrap();
        assert_eq!(array.len(), 2);

        let lists = array
            .as_any()
            .downcast_ref::<FixedSizeListArray>()
            .unwrap();
        let row = lists.value(1);
        let row = row.as_any().downcast_ref::<Float32Array>().unwrap();
        assert_eq!(row.values(), &[3.0, 4.0, 5.0]);
    }

    #[test]
    fn test_build_array_shape_mismatch() {
        let err = build_array(&[2, 3], SliceData::Int32(vec![1, 2, 3, 4])).unwrap_err();
        assert!(matches!(err, ScanError::Shape(_)));
    }

    #[test]
    fn test_build_array_strings() {
        let array = build_array(
            &[2],
            SliceData::Str(vec!["a".to_string(), "b".to_string()]),
        )
        .unwrap();
        assert_eq!(array.data_type(), &DataType::Utf8);
    }
}
