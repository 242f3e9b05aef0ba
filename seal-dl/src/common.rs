pub use anyhow::{bail, ensure, format_err, Context as _, Error, Result};
pub use approx::assert_abs_diff_eq;
pub use bbox::{prelude::*, CyCxHW, Transform as RectTransform, HW, TLBR};
pub use futures::stream::{self, Stream, StreamExt as _, TryStreamExt as _};
pub use itertools::{izip, Itertools as _};
pub use ::label::Label;
pub use log::{debug, info, warn};
pub use noisy_float::prelude::*;
pub use par_stream::prelude::*;
pub use rand::{prelude::*, rngs::StdRng};
pub use serde::{Deserialize, Serialize};
pub use slice_of_array::SliceFlatExt as _;
pub use std::{
    collections::{hash_map, HashMap, HashSet},
    fmt,
    fmt::Debug,
    num::NonZeroUsize,
    path::{Path, PathBuf},
    pin::Pin,
    sync::Arc,
    time::{Duration, Instant},
};
pub use tch::{vision, Device, Kind, Tensor};

unzip_n::unzip_n!(pub 5);
