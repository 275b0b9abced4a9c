use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use chrono::NaiveDate;
use tracing::trace;

use crate::datetime::days_until;
use crate::task::{
  Priority,
  Task
};

/// Days remaining (inclusive) that
/// still count as "due soon".
pub const DUE_SOON_DAYS: i64 = 2;

#[derive(
  Debug, Clone, Copy, PartialEq, Eq,
)]
pub enum DueDateStatus {
  Overdue,
  DueSoon,
  Normal,
  None
}

/// Classifies `end_date` against
/// `today`. Callers pass the current
/// local date on every render.
#[must_use]
pub fn due_date_status(
  end_date: Option<NaiveDate>,
  today: NaiveDate
) -> DueDateStatus {
  let Some(end) = end_date else {
    return DueDateStatus::None;
  };
  match days_until(end, today) {
    | days if days < 0 => {
      DueDateStatus::Overdue
    }
    | days if days <= DUE_SOON_DAYS => {
      DueDateStatus::DueSoon
    }
    | _ => DueDateStatus::Normal
  }
}

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Default,
)]
pub enum StatusFilter {
  #[default]
  All,
  Completed,
  Incomplete
}

impl FromStr for StatusFilter {
  type Err = anyhow::Error;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    match s
      .trim()
      .to_ascii_lowercase()
      .as_str()
    {
      | "all" | "" => Ok(Self::All),
      | "completed" | "done" => {
        Ok(Self::Completed)
      }
      | "incomplete" | "open" => {
        Ok(Self::Incomplete)
      }
      | other => Err(anyhow!(
        "unknown status filter: \
         {other}"
      ))
    }
  }
}

#[derive(
  Debug, Clone, Copy, PartialEq, Eq,
)]
pub enum SortCriterion {
  DateCreated,
  DueDate,
  Priority,
  Status
}

#[derive(
  Debug, Clone, Copy, PartialEq, Eq,
)]
pub enum SortDirection {
  Asc,
  Desc
}

#[derive(
  Debug, Clone, Copy, PartialEq, Eq,
)]
pub struct SortBy {
  pub criterion: SortCriterion,
  pub direction: SortDirection
}

impl SortBy {
  #[must_use]
  pub fn new(
    criterion: SortCriterion,
    direction: SortDirection
  ) -> Self {
    Self {
      criterion,
      direction
    }
  }

  #[must_use]
  pub fn reversed(self) -> Self {
    let direction = match self.direction
    {
      | SortDirection::Asc => {
        SortDirection::Desc
      }
      | SortDirection::Desc => {
        SortDirection::Asc
      }
    };
    Self {
      direction,
      ..self
    }
  }
}

impl FromStr for SortBy {
  type Err = anyhow::Error;

  /// Parses the `criterion-direction`
  /// form, e.g. `dueDate-asc`.
  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    let (criterion, direction) = s
      .trim()
      .split_once('-')
      .ok_or_else(|| {
        anyhow!(
          "expected \
           <criterion>-<direction>, \
           got: {s}"
        )
      })?;

    let criterion = match criterion
      .to_ascii_lowercase()
      .as_str()
    {
      | "datecreated" | "created" => {
        SortCriterion::DateCreated
      }
      | "duedate" | "due" => {
        SortCriterion::DueDate
      }
      | "priority" => {
        SortCriterion::Priority
      }
      | "status" => SortCriterion::Status,
      | other => {
        return Err(anyhow!(
          "unknown sort criterion: \
           {other}"
        ));
      }
    };

    let direction = match direction
      .to_ascii_lowercase()
      .as_str()
    {
      | "asc" => SortDirection::Asc,
      | "desc" => SortDirection::Desc,
      | other => {
        return Err(anyhow!(
          "unknown sort direction: \
           {other}"
        ));
      }
    };

    Ok(Self::new(criterion, direction))
  }
}

impl fmt::Display for SortBy {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    let criterion = match self.criterion
    {
      | SortCriterion::DateCreated => {
        "dateCreated"
      }
      | SortCriterion::DueDate => {
        "dueDate"
      }
      | SortCriterion::Priority => {
        "priority"
      }
      | SortCriterion::Status => {
        "status"
      }
    };
    let direction = match self.direction
    {
      | SortDirection::Asc => "asc",
      | SortDirection::Desc => "desc"
    };
    write!(f, "{criterion}-{direction}")
  }
}

#[derive(
  Debug, Clone, PartialEq, Eq, Default,
)]
pub struct FilterCriteria {
  pub search:   String,
  /// `None` means every priority.
  pub priority: Option<Priority>,
  pub status:   StatusFilter,
  /// `None` means every category.
  pub category: Option<String>,
  pub sort_by:  Option<SortBy>
}

impl FilterCriteria {
  #[must_use]
  pub fn matches(
    &self,
    task: &Task
  ) -> bool {
    let search_match = self
      .search
      .is_empty()
      || {
        let needle =
          self.search.to_lowercase();
        task
          .text
          .to_lowercase()
          .contains(&needle)
          || task
            .markdown
            .to_lowercase()
            .contains(&needle)
      };

    let priority_match = self
      .priority
      .is_none_or(|wanted| {
        task.priority == Some(wanted)
      });

    let status_match =
      match self.status {
        | StatusFilter::All => true,
        | StatusFilter::Completed => {
          task.completed
        }
        | StatusFilter::Incomplete => {
          !task.completed
        }
      };

    let category_match = self
      .category
      .as_deref()
      .is_none_or(|wanted| {
        task.category.as_deref()
          == Some(wanted)
      });

    search_match
      && priority_match
      && status_match
      && category_match
  }
}

/// Keeps the tasks `criteria` accepts,
/// in their original relative order.
pub fn filter_tasks<'a, I>(
  tasks: I,
  criteria: &FilterCriteria
) -> Vec<&'a Task>
where
  I: IntoIterator<Item = &'a Task>
{
  let kept: Vec<&'a Task> = tasks
    .into_iter()
    .filter(|task| {
      criteria.matches(task)
    })
    .collect();
  trace!(
    kept = kept.len(),
    "filtered tasks"
  );
  kept
}

/// Returns a sorted copy of `tasks`.
/// The sort is stable, so equal keys
/// keep their prior order in either
/// direction.
#[must_use]
pub fn sort_tasks<'a>(
  tasks: &[&'a Task],
  sort_by: SortBy
) -> Vec<&'a Task> {
  let mut sorted = tasks.to_vec();
  sorted.sort_by(|a, b| {
    let ordering =
      compare(a, b, sort_by.criterion);
    match sort_by.direction {
      | SortDirection::Asc => ordering,
      | SortDirection::Desc => {
        ordering.reverse()
      }
    }
  });
  sorted
}

fn compare(
  a: &Task,
  b: &Task,
  criterion: SortCriterion
) -> Ordering {
  match criterion {
    | SortCriterion::DateCreated => {
      a.created_at.cmp(&b.created_at)
    }
    | SortCriterion::DueDate => {
      let far = NaiveDate::MAX;
      a.end_date
        .unwrap_or(far)
        .cmp(&b.end_date.unwrap_or(far))
    }
    | SortCriterion::Priority => {
      Priority::rank_of(a.priority)
        .cmp(&Priority::rank_of(
          b.priority
        ))
    }
    | SortCriterion::Status => {
      a.completed.cmp(&b.completed)
    }
  }
}

/// Filters, then sorts when a sort
/// order is selected.
pub fn derive_view<'a>(
  tasks: &'a [Task],
  criteria: &FilterCriteria
) -> Vec<&'a Task> {
  let filtered =
    filter_tasks(tasks, criteria);
  match criteria.sort_by {
    | Some(sort_by) => {
      sort_tasks(&filtered, sort_by)
    }
    | None => filtered
  }
}

#[must_use]
pub fn extract_categories(
  tasks: &[Task]
) -> BTreeSet<String> {
  tasks
    .iter()
    .filter_map(|task| {
      task.category.as_deref()
    })
    .filter(|category| {
      !category.is_empty()
    })
    .map(str::to_string)
    .collect()
}

/// One page of a derived list.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq,
)]
pub struct PageWindow {
  /// 1-based, clamped into range.
  pub page:        usize,
  pub total_pages: usize,
  pub start:       usize,
  pub end:         usize
}

#[must_use]
pub fn page_window(
  total: usize,
  page: usize,
  per_page: usize
) -> PageWindow {
  let per_page = per_page.max(1);
  let total_pages =
    total.div_ceil(per_page).max(1);
  let page = page.clamp(1, total_pages);
  let start = (page - 1) * per_page;
  let end = (start + per_page).min(total);
  PageWindow {
    page,
    total_pages,
    start: start.min(total),
    end
  }
}
