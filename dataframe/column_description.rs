use super::DatasetError;
use std::{collections::BTreeMap, path::Path};

/// The role a column of the dataset plays.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColumnRole {
	Num,
	Categ,
	Label,
	Weight,
	GroupId,
	Auxiliary,
}

impl ColumnRole {
	fn parse(value: &str) -> Option<ColumnRole> {
		match value {
			"Num" => Some(ColumnRole::Num),
			"Categ" => Some(ColumnRole::Categ),
			"Label" | "Target" => Some(ColumnRole::Label),
			"Weight" => Some(ColumnRole::Weight),
			"GroupId" | "QueryId" => Some(ColumnRole::GroupId),
			"Auxiliary" => Some(ColumnRole::Auxiliary),
			_ => None,
		}
	}

	pub fn is_feature(self) -> bool {
		matches!(self, ColumnRole::Num | ColumnRole::Categ)
	}
}

/**
A `ColumnDescription` assigns roles to the columns of a dataset. It is read from a text file with one `index<TAB>role[<TAB>name]` line per described column. Blank lines and lines starting with `#` are ignored. Columns that are not described are numeric features.
*/
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ColumnDescription {
	columns: BTreeMap<usize, (ColumnRole, Option<String>)>,
}

/// The resolved position of every column with a role, for a dataset with a known number of columns.
#[derive(Clone, Debug, PartialEq)]
pub struct ColumnLayout {
	pub n_columns: usize,
	pub label: Option<usize>,
	pub weight: Option<usize>,
	pub group_id: Option<usize>,
	/// The column index and role of each feature, in feature order.
	pub features: Vec<(usize, ColumnRole)>,
}

impl ColumnDescription {
	pub fn from_path(path: &Path) -> Result<ColumnDescription, DatasetError> {
		let text = std::fs::read_to_string(path).map_err(|source| DatasetError::Open {
			path: path.to_owned(),
			source,
		})?;
		text.parse()
	}

	/// The description used when no file is given: column 0 is the label and every other column is a numeric feature.
	pub fn label_first() -> ColumnDescription {
		let mut columns = BTreeMap::new();
		columns.insert(0, (ColumnRole::Label, None));
		ColumnDescription { columns }
	}

	pub fn role(&self, column_index: usize) -> ColumnRole {
		self.columns
			.get(&column_index)
			.map(|(role, _)| *role)
			.unwrap_or(ColumnRole::Num)
	}

	/// The smallest number of columns a dataset must have for every described column to exist.
	pub fn min_columns(&self) -> usize {
		self.columns
			.keys()
			.next_back()
			.map(|index| index + 1)
			.unwrap_or(0)
	}

	pub fn layout(&self, n_columns: usize) -> ColumnLayout {
		let mut layout = ColumnLayout {
			n_columns,
			label: None,
			weight: None,
			group_id: None,
			features: Vec::new(),
		};
		for column_index in 0..n_columns {
			match self.role(column_index) {
				ColumnRole::Label => layout.label = Some(column_index),
				ColumnRole::Weight => layout.weight = Some(column_index),
				ColumnRole::GroupId => layout.group_id = Some(column_index),
				ColumnRole::Auxiliary => {}
				role => layout.features.push((column_index, role)),
			}
		}
		layout
	}

	/// The roles of the feature columns in feature order, for every feature column that lies within the described columns. Used to check a model's feature types before any data is read.
	pub fn described_feature_roles(&self) -> Vec<ColumnRole> {
		(0..self.min_columns())
			.map(|column_index| self.role(column_index))
			.filter(|role| role.is_feature())
			.collect()
	}
}

impl std::str::FromStr for ColumnDescription {
	type Err = DatasetError;

	fn from_str(text: &str) -> Result<ColumnDescription, DatasetError> {
		let mut columns = BTreeMap::new();
		for (line_index, line) in text.lines().enumerate() {
			let line_number = line_index + 1;
			let line = line.trim();
			if line.is_empty() || line.starts_with('#') {
				continue;
			}
			let mut fields = line.split('\t').map(str::trim);
			let column_index = fields
				.next()
				.and_then(|field| field.parse::<usize>().ok())
				.ok_or_else(|| DatasetError::ColumnDescription {
					line: line_number,
					message: "expected a column index".to_owned(),
				})?;
			let role = fields.next().unwrap_or_default();
			let role = ColumnRole::parse(role).ok_or_else(|| DatasetError::ColumnDescription {
				line: line_number,
				message: format!("unknown column role {:?}", role),
			})?;
			let name = fields
				.next()
				.filter(|name| !name.is_empty())
				.map(|name| name.to_owned());
			if columns.insert(column_index, (role, name)).is_some() {
				return Err(DatasetError::ColumnDescription {
					line: line_number,
					message: format!("column {} is described twice", column_index),
				});
			}
		}
		let n_labels = columns
			.values()
			.filter(|(role, _)| *role == ColumnRole::Label)
			.count();
		if n_labels > 1 {
			return Err(DatasetError::ColumnDescription {
				line: 0,
				message: "more than one label column".to_owned(),
			});
		}
		Ok(ColumnDescription { columns })
	}
}

#[test]
fn test_parse_column_description() {
	let column_description: ColumnDescription = "0\tLabel\n# comment\n1\tCateg\tcolor\n3\tGroupId\n4\tWeight\n"
		.parse()
		.unwrap();
	assert_eq!(column_description.role(0), ColumnRole::Label);
	assert_eq!(column_description.role(1), ColumnRole::Categ);
	assert_eq!(column_description.role(2), ColumnRole::Num);
	assert_eq!(column_description.min_columns(), 5);
	let layout = column_description.layout(6);
	assert_eq!(layout.label, Some(0));
	assert_eq!(layout.group_id, Some(3));
	assert_eq!(layout.weight, Some(4));
	assert_eq!(
		layout.features,
		vec![
			(1, ColumnRole::Categ),
			(2, ColumnRole::Num),
			(5, ColumnRole::Num)
		]
	);
	assert_eq!(
		column_description.described_feature_roles(),
		vec![ColumnRole::Categ, ColumnRole::Num]
	);
}

#[test]
fn test_parse_column_description_errors() {
	assert!("x\tLabel".parse::<ColumnDescription>().is_err());
	assert!("0\tBogus".parse::<ColumnDescription>().is_err());
	assert!("0\tLabel\n0\tNum".parse::<ColumnDescription>().is_err());
	assert!("0\tLabel\n1\tLabel".parse::<ColumnDescription>().is_err());
}

#[test]
fn test_column_description_error_message() {
	let error = "0\tLabel\n# comment\n2\tText"
		.parse::<ColumnDescription>()
		.unwrap_err();
	insta::assert_display_snapshot!(error, @r###"column description line 3: unknown column role "Text""###);
}
