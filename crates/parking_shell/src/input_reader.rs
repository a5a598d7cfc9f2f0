use parking_services::{InputError, InputReader};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Stdin};
use tokio::sync::Mutex;

/// Reads operator answers line by line from a terminal or any buffered reader
pub struct ConsoleInputReader<R> {
    reader: Mutex<R>,
}

impl ConsoleInputReader<BufReader<Stdin>> {
    /// Reader over the process's standard input
    pub fn stdin() -> Self {
        Self::new(BufReader::new(tokio::io::stdin()))
    }
}

impl<R> ConsoleInputReader<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    /// Wraps a buffered reader
    pub fn new(reader: R) -> Self {
        Self {
            reader: Mutex::new(reader),
        }
    }

    async fn read_line(&self) -> Result<String, InputError> {
        let mut line = Vec::new();
        let read = self
            .reader
            .lock()
            .await
            .read_until(b'\n', &mut line)
            .await?;

        if read == 0 {
            return Err(InputError::EndOfInput);
        }

        // Bytes that are not UTF-8 become replacement characters, which then
        // fail to parse like any other garbled answer.
        Ok(String::from_utf8_lossy(&line).trim().to_string())
    }
}

#[async_trait::async_trait]
impl<R> InputReader for ConsoleInputReader<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    async fn read_selection(&self) -> Result<i32, InputError> {
        let line = self.read_line().await?;

        match line.parse::<i32>() {
            Ok(selection) => Ok(selection),
            Err(_) => {
                log::error!("Error while reading user input from shell: '{}'", line);
                println!("Error reading input. Please enter valid number for proceeding further");
                Ok(-1)
            }
        }
    }

    async fn read_vehicle_registration_number(&self) -> Result<String, InputError> {
        println!("Please type the vehicle registration number and press enter key");

        let vehicle_reg_number = self.read_line().await?;
        if vehicle_reg_number.is_empty() {
            log::error!("Empty vehicle registration number entered");
            return Err(InputError::EmptyRegistration);
        }

        Ok(vehicle_reg_number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn reader(input: &str) -> ConsoleInputReader<Cursor<Vec<u8>>> {
        ConsoleInputReader::new(Cursor::new(input.as_bytes().to_vec()))
    }

    #[tokio::test]
    async fn test_read_selection() {
        let input = reader("1\n 2 \nthree\n\n");

        assert_eq!(input.read_selection().await.unwrap(), 1);
        assert_eq!(input.read_selection().await.unwrap(), 2);
        assert_eq!(input.read_selection().await.unwrap(), -1);
        assert_eq!(input.read_selection().await.unwrap(), -1);
        assert!(matches!(
            input.read_selection().await,
            Err(InputError::EndOfInput)
        ));
    }

    #[tokio::test]
    async fn test_non_utf8_selection_is_invalid() {
        let input = ConsoleInputReader::new(Cursor::new(b"\xff\xfe\n2\n".to_vec()));

        assert_eq!(input.read_selection().await.unwrap(), -1);
        assert_eq!(input.read_selection().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_last_line_without_newline() {
        let input = reader("1");

        assert_eq!(input.read_selection().await.unwrap(), 1);
        assert!(matches!(
            input.read_selection().await,
            Err(InputError::EndOfInput)
        ));
    }

    #[tokio::test]
    async fn test_read_registration_is_trimmed() {
        let input = reader("  ABCDEF  \r\n");

        assert_eq!(
            input.read_vehicle_registration_number().await.unwrap(),
            "ABCDEF"
        );
    }

    #[tokio::test]
    async fn test_blank_registration_is_rejected() {
        let input = reader("   \n");

        assert!(matches!(
            input.read_vehicle_registration_number().await,
            Err(InputError::EmptyRegistration)
        ));
    }
}
