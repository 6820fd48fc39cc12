//! Turns an ordered list of table columns into pixel spans for a given width.

#[derive(Debug, Clone, PartialEq)]
pub struct Column<Id> {
    pub id: Id,
    pub text_width: f32,
    pub border_l: f32,
    pub border_r: f32,
    pub text_l: f32,
    pub text_r: f32,
    pub auto_width: bool,
}

#[derive(Debug, Clone)]
pub struct ColumnLayout<Id> {
    columns: Vec<Column<Id>>,
}

impl<Id> Default for ColumnLayout<Id> {
    fn default() -> Self {
        ColumnLayout { columns: Vec::new() }
    }
}

impl<Id: Copy + PartialEq> ColumnLayout<Id> {
    pub fn new() -> ColumnLayout<Id> {
        ColumnLayout::default()
    }

    pub fn reset(&mut self) {
        self.columns.clear();
    }

    /// A `text_width` of zero makes the column share the leftover space.
    pub fn add_with_borders(&mut self, id: Id, text_width: f32, border_l: f32, border_r: f32) {
        self.columns.push(Column {
            id,
            text_width,
            border_l,
            border_r,
            text_l: 0.0,
            text_r: 0.0,
            auto_width: text_width == 0.0,
        });
    }

    pub fn add(&mut self, id: Id, text_width: f32, border: f32) {
        self.add_with_borders(id, text_width, border, border);
    }

    pub fn layout(&mut self, total_width: f32) {
        let mut auto_count = 0;
        let mut fixed_width = 0.0;
        for column in &self.columns {
            if column.auto_width {
                auto_count += 1;
                fixed_width += column.border_l + column.border_r;
            } else {
                fixed_width += column.text_width + column.border_l + column.border_r;
            }
        }

        let auto_text_width = if auto_count > 0 {
            ((total_width - fixed_width) / auto_count as f32).max(0.0)
        } else {
            0.0
        };

        let mut x = 0.0;
        for column in &mut self.columns {
            if column.auto_width {
                column.text_width = auto_text_width;
            }
            column.text_l = x + column.border_l;
            column.text_r = column.text_l + column.text_width;
            x = column.text_r + column.border_r;
        }
    }

    pub fn get(&self, id: Id) -> Option<&Column<Id>> {
        self.columns.iter().find(|column| column.id == id)
    }

    pub fn columns(&self) -> &[Column<Id>] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-3
    }

    fn table() -> ColumnLayout<u8> {
        let mut columns = ColumnLayout::new();
        columns.add(0, 30.0, 8.0);
        columns.add(1, 0.0, 8.0);
        columns.add_with_borders(2, 40.0, 2.0, 6.0);
        columns.add(3, 0.0, 4.0);
        columns
    }

    #[test]
    fn spans_add_up_to_total_width() {
        for total in [200.0, 333.3, 1024.0] {
            let mut columns = table();
            columns.layout(total);

            let last = columns.columns().last().unwrap();
            assert!(close(last.text_r + last.border_r, total), "total {}", total);

            for pair in columns.columns().windows(2) {
                assert!(pair[0].text_l <= pair[0].text_r);
                assert!(close(pair[0].text_r + pair[0].border_r + pair[1].border_l, pair[1].text_l));
            }
        }
    }

    #[test]
    fn auto_columns_share_leftover_space() {
        let mut columns = table();
        columns.layout(200.0);
        // fixed: 30+16 + 40+8, borders of auto columns: 16 + 8
        let expected = (200.0 - 118.0) / 2.0;
        assert!(close(columns.get(1).unwrap().text_width, expected));
        assert!(close(columns.get(3).unwrap().text_width, expected));
        assert!(close(columns.get(0).unwrap().text_l, 8.0));
        assert!(close(columns.get(0).unwrap().text_r, 38.0));
    }

    #[test]
    fn auto_width_clamps_to_zero_when_too_narrow() {
        let mut columns = table();
        columns.layout(50.0);
        for column in columns.columns().iter().filter(|c| c.auto_width) {
            assert_eq!(column.text_width, 0.0);
            assert_eq!(column.text_l, column.text_r);
        }
    }

    #[test]
    fn layout_is_recomputed_for_new_width() {
        let mut columns = table();
        columns.layout(200.0);
        columns.layout(400.0);
        let last = columns.columns().last().unwrap();
        assert!(close(last.text_r + last.border_r, 400.0));
    }

    #[test]
    fn missing_column_is_none() {
        let mut columns = table();
        columns.layout(200.0);
        assert!(columns.get(9).is_none());
        columns.reset();
        assert!(columns.is_empty());
        assert!(columns.get(0).is_none());
    }

    #[test]
    fn fixed_only_layout_keeps_declared_widths() {
        let mut columns = ColumnLayout::new();
        columns.add('a', 10.0, 1.0);
        columns.add('b', 20.0, 1.0);
        columns.layout(5.0);
        assert_eq!(columns.get('b').unwrap().text_l, 13.0);
        assert_eq!(columns.get('b').unwrap().text_r, 33.0);
    }
}
