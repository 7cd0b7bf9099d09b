// Domain models: frames, query requests, snapshots, datasources

mod datasource;
mod frame;
mod logs_volume;
mod query;

pub use datasource::{DataSource, DataSourceAccess, DataSourceSpec};
pub use frame::{
    BarAlignment, DrawStyle, Field, FieldColor, FieldColorMode, FieldConfig, FieldType,
    FieldValues, Frame, GraphFieldConfig, Labels, RawResult, StackingConfig, StackingMode,
    TimeSeries, to_frame,
};
pub use logs_volume::LogsVolume;
pub use query::{LokiQuery, QueryRequest, QueryResponse, TimeRange};
