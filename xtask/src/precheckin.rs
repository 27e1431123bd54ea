// Licensed under the Apache-2.0 license

use anyhow::Result;

pub(crate) fn precheckin() -> Result<()> {
    crate::format::format()?;
    crate::clippy::clippy()?;
    crate::header::check()?;
    crate::test::test()
}
