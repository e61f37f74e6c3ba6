// Copyright 2025 Fernando Borretti
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::path::Path;

use crate::error::Fallible;
use crate::error::fail;
use crate::journal::History;
use crate::journal::Journal;

pub fn print_history(path: &Path) -> Fallible<()> {
    let history = load_history(path)?;
    let json = serde_json::to_string_pretty(&history)?;
    println!("{json}");
    Ok(())
}

fn load_history(path: &Path) -> Fallible<History> {
    if !path.exists() {
        return fail(format!("journal {} does not exist.", path.display()));
    }
    Journal::open(path)?.history()
}
