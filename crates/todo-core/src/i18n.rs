use crate::state::Language;
use crate::task::Priority;
use crate::transform::DueDateStatus;

#[derive(
  Debug, Clone, Copy, PartialEq, Eq,
)]
pub enum Label {
  Task,
  Priority,
  Category,
  Dates,
  Status,
  Low,
  Medium,
  High,
  NoCategory,
  AllCategories,
  Completed,
  Incomplete,
  Overdue,
  DueSoon,
  Page,
  NoTasks,
  ImportSuccess,
  ImportError,
  SaveError,
  EmptyTask,
  EmptySubtask
}

#[must_use]
pub fn text(
  language: Language,
  label: Label
) -> &'static str {
  match language {
    | Language::English => english(label),
    | Language::Vietnamese => {
      vietnamese(label)
    }
  }
}

fn english(label: Label) -> &'static str {
  match label {
    | Label::Task => "Task",
    | Label::Priority => "Priority",
    | Label::Category => "Category",
    | Label::Dates => "Dates",
    | Label::Status => "Status",
    | Label::Low => "Low",
    | Label::Medium => "Medium",
    | Label::High => "High",
    | Label::NoCategory => "No category",
    | Label::AllCategories => {
      "All categories"
    }
    | Label::Completed => "Completed",
    | Label::Incomplete => "Incomplete",
    | Label::Overdue => "Overdue",
    | Label::DueSoon => "Due Soon",
    | Label::Page => "Page",
    | Label::NoTasks => "No tasks",
    | Label::ImportSuccess => {
      "Tasks imported successfully!"
    }
    | Label::ImportError => {
      "Error importing tasks. Please \
       check the file format."
    }
    | Label::SaveError => {
      "Changes could not be saved to \
       storage."
    }
    | Label::EmptyTask => {
      "Task description is required."
    }
    | Label::EmptySubtask => {
      "Subtask text is required."
    }
  }
}

fn vietnamese(
  label: Label
) -> &'static str {
  match label {
    | Label::Task => "Công việc",
    | Label::Priority => "Độ ưu tiên",
    | Label::Category => "Danh mục",
    | Label::Dates => "Thời gian",
    | Label::Status => "Trạng thái",
    | Label::Low => "Thấp",
    | Label::Medium => "Trung bình",
    | Label::High => "Cao",
    | Label::NoCategory => {
      "Không có danh mục"
    }
    | Label::AllCategories => {
      "Tất cả danh mục"
    }
    | Label::Completed => {
      "Đã hoàn thành"
    }
    | Label::Incomplete => {
      "Chưa hoàn thành"
    }
    | Label::Overdue => "Quá hạn",
    | Label::DueSoon => "Sắp đến hạn",
    | Label::Page => "Trang",
    | Label::NoTasks => {
      "Không có công việc"
    }
    | Label::ImportSuccess => {
      "Nhập dữ liệu thành công!"
    }
    | Label::ImportError => {
      "Lỗi khi nhập dữ liệu. Vui lòng \
       kiểm tra định dạng tệp."
    }
    | Label::SaveError => {
      "Không thể lưu thay đổi."
    }
    | Label::EmptyTask => {
      "Cần nhập mô tả công việc."
    }
    | Label::EmptySubtask => {
      "Cần nhập nội dung công việc \
       con."
    }
  }
}

#[must_use]
pub fn priority_label(
  language: Language,
  priority: Option<Priority>
) -> &'static str {
  match priority {
    | Some(Priority::Low) => {
      text(language, Label::Low)
    }
    | Some(Priority::Medium) => {
      text(language, Label::Medium)
    }
    | Some(Priority::High) => {
      text(language, Label::High)
    }
    | None => ""
  }
}

/// Badge text for a due-date state;
/// empty when no badge is shown.
#[must_use]
pub fn due_label(
  language: Language,
  status: DueDateStatus
) -> &'static str {
  match status {
    | DueDateStatus::Overdue => {
      text(language, Label::Overdue)
    }
    | DueDateStatus::DueSoon => {
      text(language, Label::DueSoon)
    }
    | DueDateStatus::Normal
    | DueDateStatus::None => ""
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn labels_follow_language() {
    assert_eq!(
      text(
        Language::English,
        Label::NoCategory
      ),
      "No category"
    );
    assert_eq!(
      text(
        Language::Vietnamese,
        Label::NoCategory
      ),
      "Không có danh mục"
    );
    assert_eq!(
      priority_label(
        Language::Vietnamese,
        Some(Priority::High)
      ),
      "Cao"
    );
    assert_eq!(
      due_label(
        Language::English,
        DueDateStatus::Normal
      ),
      ""
    );
  }
}
